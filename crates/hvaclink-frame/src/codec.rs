use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::delimiters::Delimiters;
use crate::packet::Packet;

/// Summary of one scan over a chunk of received bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scan {
    /// Packets appended to the output, in wire order.
    pub packets: usize,
    /// Terminated packet bodies that were malformed and dropped.
    pub discarded: usize,
    /// Offset of a `START` that had no `END` after it, if any.
    ///
    /// Everything from this offset onward is an incomplete trailing packet.
    pub unterminated: Option<usize>,
}

/// Why a terminated packet body was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Malformed {
    MissingFieldSeparator,
    EmptyCommand,
    MissingDataTerminator,
}

impl Malformed {
    fn as_str(self) -> &'static str {
        match self {
            Malformed::MissingFieldSeparator => "no field separator after command",
            Malformed::EmptyCommand => "missing command field",
            Malformed::MissingDataTerminator => "no field separator after data",
        }
    }
}

/// Decode every complete packet in `src`.
///
/// Noise before, between, and after packets is skipped. Malformed packets
/// are dropped without stopping the scan. An unterminated trailing packet
/// yields nothing.
pub fn decode_packets(src: &[u8], delimiters: &Delimiters) -> Vec<Packet> {
    let mut packets = Vec::new();
    decode_into(src, delimiters, &mut packets);
    packets
}

/// Decode complete packets from `src` into `out` and report what the scan
/// found.
///
/// Scanning resumes immediately after each consumed `END`. It stops at the
/// first `START` with no later `END`, reporting that offset in
/// [`Scan::unterminated`].
pub fn decode_into<E>(src: &[u8], delimiters: &Delimiters, out: &mut E) -> Scan
where
    E: Extend<Packet>,
{
    let mut scan = Scan::default();
    let mut pos = 0usize;

    while let Some(start) = find_from(src, pos, delimiters.start()) {
        let Some(end) = find_from(src, start + 1, delimiters.end()) else {
            scan.unterminated = Some(start);
            break;
        };

        match parse_body(&src[start + 1..end], delimiters) {
            Ok(packet) => {
                out.extend(std::iter::once(packet));
                scan.packets += 1;
            }
            Err(reason) => {
                debug!(
                    reason = reason.as_str(),
                    body = %String::from_utf8_lossy(&src[start + 1..end]),
                    "discarding malformed packet"
                );
                scan.discarded += 1;
            }
        }
        pos = end + 1;
    }

    scan
}

/// Split a packet body (the bytes strictly between `START` and `END`) into
/// command and data.
fn parse_body(body: &[u8], delimiters: &Delimiters) -> Result<Packet, Malformed> {
    let sep = delimiters.field_separator();
    let first = find_from(body, 0, sep).ok_or(Malformed::MissingFieldSeparator)?;
    if first == 0 {
        return Err(Malformed::EmptyCommand);
    }
    let second = find_from(body, first + 1, sep).ok_or(Malformed::MissingDataTerminator)?;

    Ok(Packet::new(
        String::from_utf8_lossy(&body[..first]).into_owned(),
        String::from_utf8_lossy(&body[first + 1..second]).into_owned(),
    ))
}

fn find_from(haystack: &[u8], from: usize, needle: u8) -> Option<usize> {
    haystack
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|i| from + i)
}

/// Encode a packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────┬─────────┬───────────┬──────┬───────────┬─────┐
/// │ START │ command │ FIELD_SEP │ data │ FIELD_SEP │ END │
/// │  '*'  │         │    '|'    │      │    '|'    │ '&' │
/// └───────┴─────────┴───────────┴──────┴───────────┴─────┘
/// ```
///
/// Delimiter bytes inside `command` or `data` are not escaped; the protocol
/// has no escape mechanism.
pub fn encode_packet(command: &str, data: &str, delimiters: &Delimiters, dst: &mut BytesMut) {
    dst.reserve(command.len() + data.len() + 4);
    dst.put_u8(delimiters.start());
    dst.put_slice(command.as_bytes());
    dst.put_u8(delimiters.field_separator());
    dst.put_slice(data.as_bytes());
    dst.put_u8(delimiters.field_separator());
    dst.put_u8(delimiters.end());
}

/// Encode a packet as wire text, e.g. `*GZ1|21|&`.
pub fn encode_to_string(command: &str, data: &str, delimiters: &Delimiters) -> String {
    let mut buf = BytesMut::new();
    encode_packet(command, data, delimiters, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(src: &str) -> Vec<(String, String)> {
        decode_packets(src.as_bytes(), &Delimiters::default())
            .into_iter()
            .map(Packet::into_parts)
            .collect()
    }

    fn pair(command: &str, data: &str) -> (String, String) {
        (command.to_string(), data.to_string())
    }

    #[test]
    fn decodes_single_packet() {
        assert_eq!(pairs("*GZ1|3|&"), vec![pair("GZ1", "3")]);
    }

    #[test]
    fn decodes_empty_data() {
        assert_eq!(pairs("*RS||&"), vec![pair("RS", "")]);
    }

    #[test]
    fn decodes_concatenated_packets_in_order() {
        assert_eq!(
            pairs("*A|1|&*B|2|&*C|3|&"),
            vec![pair("A", "1"), pair("B", "2"), pair("C", "3")]
        );
    }

    #[test]
    fn skips_noise_around_packets() {
        assert_eq!(
            pairs("junk*RS||&more*VS|x|&"),
            vec![pair("RS", ""), pair("VS", "x")]
        );
        assert_eq!(pairs("  \r\n*RS||&\n\n"), vec![pair("RS", "")]);
    }

    #[test]
    fn no_start_yields_nothing() {
        assert!(pairs("just some text|with|separators&").is_empty());
        assert!(pairs("").is_empty());
    }

    #[test]
    fn dangling_start_yields_preceding_packets_only() {
        assert_eq!(pairs("*A|1|&*B|2|"), vec![pair("A", "1")]);
        assert!(pairs("*B|2|").is_empty());
    }

    #[test]
    fn scan_reports_unterminated_offset() {
        let mut out = Vec::new();
        let scan = decode_into(b"xx*A|1|&yy*B|2", &Delimiters::default(), &mut out);
        assert_eq!(scan.packets, 1);
        assert_eq!(scan.unterminated, Some(10));
    }

    #[test]
    fn body_with_one_separator_is_dropped_and_scan_continues() {
        assert_eq!(pairs("*A|1&*B|2|&"), vec![pair("B", "2")]);
    }

    #[test]
    fn body_without_separator_is_dropped_and_scan_continues() {
        assert_eq!(pairs("*&*nosep&*C||&"), vec![pair("C", "")]);
    }

    #[test]
    fn empty_command_is_dropped() {
        let mut out = Vec::new();
        let scan = decode_into(b"*|data|&*OK|1|&", &Delimiters::default(), &mut out);
        assert_eq!(scan.discarded, 1);
        assert_eq!(out, vec![Packet::new("OK", "1")]);
    }

    #[test]
    fn text_after_second_separator_is_ignored() {
        assert_eq!(pairs("*BC|||&"), vec![pair("BC", "")]);
        assert_eq!(pairs("*BC|x|trailing&"), vec![pair("BC", "x")]);
    }

    #[test]
    fn start_inside_body_belongs_to_command() {
        // The scan does not restart at a second START before END.
        assert_eq!(pairs("*A*B|1|&"), vec![pair("A*B", "1")]);
    }

    #[test]
    fn whitespace_is_preserved_in_fields() {
        assert_eq!(
            pairs("junk*GZ1| |&*LAST LONG SPACED-OUT COMMAND|REALLY THE LAST PACKET|&"),
            vec![
                pair("GZ1", " "),
                pair("LAST LONG SPACED-OUT COMMAND", "REALLY THE LAST PACKET")
            ]
        );
    }

    #[test]
    fn mixed_noise_stream() {
        let src = "erty*&*RS|here_be_data|&&&junk*VS|here_be_data more|&BC|||&\
                   *|here_be_bad data|&*LP|here_be_the_last_good_data|&junk*GZ1| |&\
                   *LAST LONG SPACED-OUT COMMAND|REALLY THE LAST PACKET|&badddd junk";
        assert_eq!(
            pairs(src),
            vec![
                pair("RS", "here_be_data"),
                pair("VS", "here_be_data more"),
                pair("LP", "here_be_the_last_good_data"),
                pair("GZ1", " "),
                pair("LAST LONG SPACED-OUT COMMAND", "REALLY THE LAST PACKET"),
            ]
        );
    }

    #[test]
    fn custom_delimiters() {
        let d: Delimiters = "<;>".parse().unwrap();
        let packets = decode_packets(b"noise<SP;22.5;>*GZ1|3|&", &d);
        assert_eq!(packets, vec![Packet::new("SP", "22.5")]);
    }

    #[test]
    fn encoded_packet_decodes_to_same_fields() {
        let d = Delimiters::default();
        for (command, data) in [("GZ1", "3"), ("RS", ""), ("VS", "here be data")] {
            let wire = encode_to_string(command, data, &d);
            assert_eq!(decode_packets(wire.as_bytes(), &d), vec![Packet::new(command, data)]);
        }
    }

    #[test]
    fn encode_wire_shape() {
        assert_eq!(encode_to_string("GZ1", "37.34", &Delimiters::default()), "*GZ1|37.34|&");
        assert_eq!(encode_to_string("RS", "", &Delimiters::default()), "*RS||&");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let packets = decode_packets(b"*A\xff|1|&", &Delimiters::default());
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].data(), "1");
        assert!(packets[0].command().starts_with('A'));
    }
}
