//! the smart-HTTP transfer client.
//!
//! clone needs exactly two round-trips:
//! 1. `GET <url>/info/refs?service=git-upload-pack`: a pkt-line framed
//!    ref advertisement, scanned for the HEAD digest
//! 2. `POST <url>/git-upload-pack`: a fixed single-ref want/done
//!    request whose response body carries the raw pack stream
//!
//! there is no capability negotiation and no timeout handling; a
//! stalled remote is a hang, not a fault.

use std::io::Read;

use crate::storage::ObjectId;
use crate::transport::error::{TransferError, TransferResult};

/// Fetch the ref advertisement and extract the HEAD digest.
pub fn discover_head(url: &str) -> TransferResult<ObjectId> {
    let endpoint = format!(
        "{}/info/refs?service=git-upload-pack",
        url.trim_end_matches('/')
    );
    let response = ureq::get(&endpoint).call().map_err(Box::new)?;

    let mut body = Vec::new();
    response.into_reader().read_to_end(&mut body)?;
    parse_head(&body)
}

/// Request a pack for a single wanted digest and return the raw stream.
pub fn fetch_pack(url: &str, want: ObjectId) -> TransferResult<Vec<u8>> {
    let endpoint = format!("{}/git-upload-pack", url.trim_end_matches('/'));
    // fixed pkt-line framing: one want, then done
    let request = format!("0032want {}\n00000009done\n", want);

    let response = ureq::post(&endpoint)
        .set("Content-Type", "application/x-git-upload-pack-request")
        .send_bytes(request.as_bytes())
        .map_err(Box::new)?;

    let mut body = Vec::new();
    response.into_reader().read_to_end(&mut body)?;
    extract_pack(&body)
}

/// iterator over the payloads of a pkt-line framed buffer
///
/// flush pkts ("0000") delimit sections and are skipped.
struct PktLines<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PktLines<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for PktLines<'a> {
    type Item = TransferResult<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pos + 4 > self.data.len() {
                return None;
            }

            let len_field = &self.data[self.pos..self.pos + 4];
            let len_str = match std::str::from_utf8(len_field) {
                Ok(s) => s,
                Err(_) => return Some(Err(bad_frame(self.pos))),
            };
            let len = match usize::from_str_radix(len_str, 16) {
                Ok(len) => len,
                Err(_) => return Some(Err(bad_frame(self.pos))),
            };

            // flush pkt
            if len == 0 {
                self.pos += 4;
                continue;
            }

            if len < 4 || self.pos + len > self.data.len() {
                return Some(Err(bad_frame(self.pos)));
            }

            let payload = &self.data[self.pos + 4..self.pos + len];
            self.pos += len;
            return Some(Ok(payload));
        }
    }
}

fn bad_frame(pos: usize) -> TransferError {
    TransferError::BadAdvertisement(format!("bad pkt-line frame at offset {}", pos))
}

/// scan advertisement payloads for the HEAD ref and return its digest
fn parse_head(body: &[u8]) -> TransferResult<ObjectId> {
    for payload in PktLines::new(body) {
        let payload = payload?;

        // service comment, e.g. "# service=git-upload-pack"
        if payload.first() == Some(&b'#') {
            continue;
        }

        // "<40 hex> <refname>[\0<capabilities>]\n"
        let line = payload.split(|&b| b == 0).next().unwrap_or(payload);
        let line = line.strip_suffix(b"\n").unwrap_or(line);

        let mut fields = line.splitn(2, |&b| b == b' ');
        let (hex, refname) = match (fields.next(), fields.next()) {
            (Some(hex), Some(refname)) => (hex, refname),
            _ => continue,
        };

        if refname == b"HEAD" {
            let hex = std::str::from_utf8(hex)
                .map_err(|_| TransferError::MissingHead)?;
            return ObjectId::from_hex(hex).map_err(|e| {
                TransferError::BadAdvertisement(format!("bad HEAD digest: {}", e))
            });
        }
    }

    Err(TransferError::MissingHead)
}

/// slice off leading pkt frames (e.g. "0008NAK\n") and return the pack
fn extract_pack(body: &[u8]) -> TransferResult<Vec<u8>> {
    body.windows(4)
        .position(|window| window == crate::pack::SIGNATURE.as_slice())
        .map(|offset| body[offset..].to_vec())
        .ok_or(TransferError::MissingPack)
}
