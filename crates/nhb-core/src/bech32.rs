//! Bech32 address encoding, per the spec's requirement that event
//! attributes render addresses as bech32 rather than hex or base58.

use bech32::{Bech32, Hrp};

use crate::error::NhbError;

const HRP_STR: &str = "nhb";

pub fn encode_address(bytes: &[u8; 20]) -> String {
    let hrp = Hrp::parse(HRP_STR).expect("static hrp is valid");
    bech32::encode::<Bech32>(hrp, bytes).expect("20-byte payload always encodes")
}

pub fn decode_address(s: &str) -> Result<[u8; 20], NhbError> {
    let (hrp, data) = bech32::decode(s).map_err(|e| NhbError::Other(e.to_string()))?;
    if hrp.as_str() != HRP_STR {
        return Err(NhbError::Other(format!("unexpected bech32 prefix: {}", hrp)));
    }
    if data.len() != 20 {
        return Err(NhbError::Other(format!(
            "bech32 address payload must be 20 bytes, got {}",
            data.len()
        )));
    }
    let mut arr = [0u8; 20];
    arr.copy_from_slice(&data);
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let bytes = [7u8; 20];
        let encoded = encode_address(&bytes);
        assert!(encoded.starts_with("nhb1"));
        assert_eq!(decode_address(&encoded).unwrap(), bytes);
    }

    #[test]
    fn rejects_wrong_prefix() {
        let hrp = Hrp::parse("xyz").unwrap();
        let encoded = bech32::encode::<Bech32>(hrp, &[1u8; 20]).unwrap();
        assert!(decode_address(&encoded).is_err());
    }
}
