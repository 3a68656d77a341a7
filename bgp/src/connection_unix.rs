// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Neighbor links over unix domain sequenced packet sockets. Each neighbor
//! listens on a socket named after its address inside a common directory, and
//! every packet carries exactly one JSON message.

use crate::config::NeighborConfig;
use crate::connection::{Received, Transport};
use crate::error::Error;
use crate::log::connection_log_lite;
use crate::messages::Outbound;
use slog::Logger;
use socket2::{Domain, SockAddr, Socket, Type};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::net::Ipv4Addr;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::time::Duration;

const UNIT_CONNECTION: &str = "connection_unix";

const RECV_BUFFER_SIZE: usize = 64 * 1024;

pub struct UnixTransport {
    links: BTreeMap<Ipv4Addr, Socket>,
    log: Logger,
}

impl UnixTransport {
    /// Connect to every neighbor socket under `dir`. Fails on the first
    /// neighbor that cannot be reached.
    pub fn connect(
        dir: &Path,
        neighbors: &[NeighborConfig],
        log: Logger,
    ) -> Result<Self, Error> {
        let mut links = BTreeMap::new();
        for n in neighbors {
            let path = dir.join(n.address.to_string());
            let sock = Socket::new(Domain::UNIX, Type::SEQPACKET, None)?;
            sock.connect(&SockAddr::unix(&path)?)?;
            connection_log_lite!(log, info, "connected";
                "peer" => n.address.to_string(),
                "relation" => n.relation.to_string(),
                "path" => path.display().to_string()
            );
            links.insert(n.address, sock);
        }
        Ok(Self { links, log })
    }

    fn link(&self, peer: Ipv4Addr) -> Result<&Socket, Error> {
        self.links.get(&peer).ok_or(Error::UnknownPeer(peer))
    }
}

impl Transport for UnixTransport {
    fn poll(&mut self, timeout: Duration) -> Result<Vec<Ipv4Addr>, Error> {
        let peers: Vec<Ipv4Addr> = self.links.keys().copied().collect();
        let mut fds: Vec<libc::pollfd> = self
            .links
            .values()
            .map(|sock| libc::pollfd {
                fd: sock.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let timeout_ms = libc::c_int::try_from(timeout.as_millis())
            .unwrap_or(libc::c_int::MAX);

        // SAFETY: fds is a live, correctly sized array of pollfd structs
        // for the duration of the call.
        let n = unsafe {
            libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms)
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(err.into());
        }

        // Hangups and errors are reported as readable so that the following
        // recv observes the closed link.
        let ready = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
        Ok(peers
            .into_iter()
            .zip(fds.iter())
            .filter(|(_, fd)| fd.revents & ready != 0)
            .map(|(peer, _)| peer)
            .collect())
    }

    fn recv(&mut self, peer: Ipv4Addr) -> Result<Received, Error> {
        let mut sock = self.link(peer)?;
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let n = match sock.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => 0,
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            connection_log_lite!(self.log, info, "connection closed";
                "peer" => peer.to_string()
            );
            return Ok(Received::Closed);
        }
        Ok(Received::Message(serde_json::from_slice(&buf[..n])?))
    }

    fn send(
        &mut self,
        peer: Ipv4Addr,
        message: &Outbound,
    ) -> Result<(), Error> {
        let buf = message.to_wire()?;
        let sock = self.link(peer)?;
        match sock.send(&buf) {
            Ok(_) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
                ) =>
            {
                return Err(Error::Disconnected(peer));
            }
            Err(e) => return Err(e.into()),
        }
        connection_log_lite!(self.log, trace, "sent {message}";
            "peer" => peer.to_string(),
            "bytes" => buf.len()
        );
        Ok(())
    }
}
