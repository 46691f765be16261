//! AT commands of the SIMCom modem families
//!
//! `general` holds the 3GPP TS 27.007 commands both families share, `gprs`
//! the SIM800 TCP/IP application commands and `packet` the SIM5360/SIM7600
//! network and socket commands.

pub mod general;
pub mod gprs;
pub mod packet;

use atat::atat_derive::AtatResp;
use atat::AtatCmd;

/// Size of the buffer a command line is serialized into.
pub const MAX_CMD_LEN: usize = 256;

/// Longest APN accepted by the bearer and PDP context commands.
pub const MAX_APN_LEN: usize = 64;

/// Longest host name handed to the modem.
pub const MAX_HOST_LEN: usize = 64;

#[derive(Debug, Clone, AtatResp, PartialEq)]
pub struct NoResponse;

/// How the SIMCom firmware closes the response to a command.
///
/// Several commands finish on something other than the final `OK`: a data
/// prompt, a `CONNECT OK` or the header of an information line that only
/// arrives after the `OK`.
pub trait Reply: AtatCmd {
    /// Answer that signals success. `None` means the modem family's `OK`.
    const EXPECT: Option<&'static str> = None;

    /// Answers that close the response as a failure.
    const FAILURES: &'static [&'static str] = &["ERROR"];

    /// Start of the information line decoded into [`AtatCmd::Response`].
    ///
    /// Empty when the command carries no information text.
    const INFO: &'static str = "";
}

/// Serialize `cmd` into `buf`, dropping the line terminator.
pub fn command_line<'a, C: AtatCmd>(cmd: &C, buf: &'a mut [u8]) -> Option<&'a [u8]> {
    if C::MAX_LEN > buf.len() {
        return None;
    }
    let len = cmd.write(buf);
    let line = trim_line(&buf[..len]);
    if line.is_empty() {
        return None;
    }
    Some(line)
}

/// Position of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// The line starting at the first occurrence of `prefix`, without its end.
pub fn line_from<'a>(resp: &'a [u8], prefix: &str) -> Option<&'a [u8]> {
    let start = find(resp, prefix.as_bytes())?;
    let rest = &resp[start..];
    let end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);
    &line[..end]
}

#[cfg(test)]
pub(crate) fn line<C: AtatCmd>(cmd: &C) -> std::string::String {
    let mut buf = [0u8; MAX_CMD_LEN];
    let line = command_line(cmd, &mut buf).unwrap();
    std::string::String::from_utf8(line.to_vec()).unwrap()
}
