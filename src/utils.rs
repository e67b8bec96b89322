use std::{io, net::UdpSocket, time::Duration};

/// Read timeout on every receiver socket, so background loops notice a stop request.
pub(crate) const RECV_POLL: Duration = Duration::from_millis(500);

pub(crate) fn udp_sock(bind_addr: &str) -> io::Result<UdpSocket> {
    let sock = UdpSocket::bind(bind_addr).map_err(|e| {
        tracing::error!("can't create udp socket for {bind_addr} : {e}");
        e
    })?;
    sock.set_read_timeout(Some(RECV_POLL))?;
    Ok(sock)
}

pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

pub(crate) fn clamp100(v: i32) -> i32 {
    v.clamp(-100, 100)
}
