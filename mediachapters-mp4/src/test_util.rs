//! Box builders for tests.

pub(crate) fn boxed(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(payload);
    out
}

pub(crate) fn full_box(name: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let word = (u32::from(version) << 24) | (flags & 0x00FF_FFFF);
    let mut body = word.to_be_bytes().to_vec();
    body.extend_from_slice(payload);
    boxed(name, &body)
}

pub(crate) fn ftyp(major: &[u8; 4], brands: &[&[u8; 4]]) -> Vec<u8> {
    let mut payload = major.to_vec();
    payload.extend_from_slice(&0x200u32.to_be_bytes());
    for brand in brands {
        payload.extend_from_slice(*brand);
    }
    boxed(b"ftyp", &payload)
}

pub(crate) fn mvhd_v0(timescale: u32, duration: u32) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    payload.extend_from_slice(&[0; 76]);
    full_box(b"mvhd", 0, 0, &payload)
}

pub(crate) fn mdhd_v0(timescale: u32, duration: u32) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    // language "und", pre_defined
    payload.extend_from_slice(&[0x55, 0xC4, 0, 0]);
    full_box(b"mdhd", 0, 0, &payload)
}

pub(crate) fn chpl(version: u8, entries: &[(u64, &str)]) -> Vec<u8> {
    let mut payload = Vec::new();
    if version != 0 {
        payload.extend_from_slice(&[0; 4]);
    }
    payload.push(entries.len() as u8);
    for (timestamp, title) in entries {
        payload.extend_from_slice(&timestamp.to_be_bytes());
        payload.push(title.len() as u8);
        payload.extend_from_slice(title.as_bytes());
    }
    full_box(b"chpl", version, 0, &payload)
}

pub(crate) fn table(name: &[u8; 4], words: &[u32]) -> Vec<u8> {
    let payload: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    full_box(name, 0, 0, &payload)
}

pub(crate) fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut payload = vec![0u8; 8];
    payload.extend_from_slice(handler);
    payload.extend_from_slice(&[0; 13]);
    boxed(b"hdlr", &payload)
}
