// src/acl/raw.rs

//! Binary ACE and SID layout.
//!
//! Access-allowed and access-denied ACEs are `ACE_HEADER` (type, flags, size),
//! a little-endian access mask, then the SID. Every other ACE type is kept as
//! its raw bytes so a read/modify/write cycle does not lose it.

use super::{AccessControlEntry, AceFlags, AceKind, Identity};
use crate::error::AclError;

pub const ACCESS_ALLOWED_ACE_TYPE: u8 = 0;
pub const ACCESS_DENIED_ACE_TYPE: u8 = 1;

const HEADER_LEN: usize = 4;
const MASK_LEN: usize = 4;
const SID_FIXED_LEN: usize = 8;

/// Decoded view of one ACE, borrowing from the ACL buffer.
#[derive(Debug)]
pub struct RawAce<'a> {
    pub ace_type: u8,
    pub flags: u8,
    pub mask: u32,
    /// SID of allow/deny ACEs; empty for other types.
    pub sid: &'a [u8],
    pub bytes: &'a [u8],
}

/// Total length of the SID starting at `sid[0]`, if the buffer holds one.
pub fn sid_len(sid: &[u8]) -> Option<usize> {
    let count = *sid.get(1)? as usize;
    let len = SID_FIXED_LEN + 4 * count;
    (sid.len() >= len).then_some(len)
}

/// `S-R-I-S-S...` string form of a binary SID.
pub fn sid_to_string(sid: &[u8]) -> Option<String> {
    let len = sid_len(sid)?;
    let revision = sid[0];
    let authority = sid[2..8]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    let mut out = format!("S-{revision}-{authority}");
    for chunk in sid[SID_FIXED_LEN..len].chunks_exact(4) {
        let sub = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        out.push_str(&format!("-{sub}"));
    }
    Some(out)
}

/// Decode the ACE at the start of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<RawAce<'_>, AclError> {
    if bytes.len() < HEADER_LEN {
        return Err(AclError::Malformed("ACE header truncated".into()));
    }
    let ace_type = bytes[0];
    let flags = bytes[1];
    let size = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
    if size < HEADER_LEN || size > bytes.len() {
        return Err(AclError::Malformed(format!("ACE size {size} out of bounds")));
    }
    let bytes = &bytes[..size];

    match ace_type {
        ACCESS_ALLOWED_ACE_TYPE | ACCESS_DENIED_ACE_TYPE => {
            if size < HEADER_LEN + MASK_LEN + SID_FIXED_LEN {
                return Err(AclError::Malformed("ACE too short for a SID".into()));
            }
            let mask = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
            let sid_area = &bytes[HEADER_LEN + MASK_LEN..];
            let len = sid_len(sid_area)
                .ok_or_else(|| AclError::Malformed("SID runs past the ACE".into()))?;
            Ok(RawAce { ace_type, flags, mask, sid: &sid_area[..len], bytes })
        }
        _ => {
            let mask = if size >= HEADER_LEN + MASK_LEN {
                u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])
            } else {
                0
            };
            Ok(RawAce { ace_type, flags, mask, sid: &[], bytes })
        }
    }
}

impl RawAce<'_> {
    /// Lift into the model. `identity` comes from the caller's SID lookup.
    pub fn into_entry(self, identity: Identity) -> AccessControlEntry {
        let kind = match self.ace_type {
            ACCESS_ALLOWED_ACE_TYPE => AceKind::Allow,
            ACCESS_DENIED_ACE_TYPE => AceKind::Deny,
            _ => AceKind::Opaque(self.bytes.to_vec()),
        };
        AccessControlEntry {
            identity,
            kind,
            access_mask: self.mask,
            flags: AceFlags::from_bits_retain(self.flags),
            raw_sid: self.sid.to_vec(),
        }
    }
}

/// Encode one entry. Allow/deny entries need their binary SID.
pub fn encode(entry: &AccessControlEntry) -> Result<Vec<u8>, AclError> {
    let ace_type = match &entry.kind {
        AceKind::Allow => ACCESS_ALLOWED_ACE_TYPE,
        AceKind::Deny => ACCESS_DENIED_ACE_TYPE,
        AceKind::Opaque(bytes) => {
            let mut out = bytes.clone();
            if out.len() > 1 {
                out[1] = entry.flags.bits();
            }
            return Ok(out);
        }
    };

    if sid_len(&entry.raw_sid) != Some(entry.raw_sid.len()) {
        return Err(AclError::Malformed(format!("no binary SID for {}", entry.identity)));
    }
    let size = HEADER_LEN + MASK_LEN + entry.raw_sid.len();
    let size16 = u16::try_from(size)
        .map_err(|_| AclError::Malformed(format!("ACE of {size} bytes")))?;

    let mut out = Vec::with_capacity(size);
    out.push(ace_type);
    out.push(entry.flags.bits());
    out.extend_from_slice(&size16.to_le_bytes());
    out.extend_from_slice(&entry.access_mask.to_le_bytes());
    out.extend_from_slice(&entry.raw_sid);
    Ok(out)
}
