use std::net::Ipv4Addr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Datelike, Utc};

use crate::ascii85;
use crate::envelope::Envelope;
use crate::errors::TokenError;

/// Length of the fixed binary header: eight u64 fields plus two u32 fields.
pub const HEADER_SIZE: usize = (8 * 8) + (2 * 4);

const TAG_LEN: usize = 2;
const TAG_BASE64: &str = "10";
const TAG_HEX: &str = "20";
const TAG_ASCII85: &str = "30";

/// Text rendering of a sealed token. The two-character tag prefix is part
/// of the wire format and stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Base64,
    Hex,
    Ascii85,
}

/// A self-contained authentication token.
///
/// The fixed header serializes big-endian at fixed offsets (see
/// [`Token::marshal`]); `payload` is opaque application data occupying
/// every byte past the header, its length implicit in the record length.
///
/// Timestamps carry second resolution on the wire. The three bit-sets are
/// opaque to the codec: callers assign meaning to individual bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: u64,
    pub account_id: u64,

    pub group_bits: u64,
    pub access_bits: u64,
    pub flags_bits: u64,

    pub created: DateTime<Utc>,
    pub activated: DateTime<Utc>,
    pub expired: DateTime<Utc>,

    pub service: i32,
    pub ip4: Ipv4Addr,

    pub payload: Vec<u8>,
}

impl Default for Token {
    fn default() -> Self {
        Token {
            id: 0,
            account_id: 0,
            group_bits: 0,
            access_bits: 0,
            flags_bits: 0,
            created: DateTime::UNIX_EPOCH,
            activated: DateTime::UNIX_EPOCH,
            expired: DateTime::UNIX_EPOCH,
            service: 0,
            ip4: Ipv4Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }
}

impl Token {
    /// Freshly issued token: the id is the current nanosecond timestamp,
    /// `created` is now. Everything else is left for the issuer to fill in.
    pub fn new() -> Self {
        let now = Utc::now();
        Token {
            id: now.timestamp_nanos_opt().unwrap_or_default() as u64,
            created: now,
            ..Token::default()
        }
    }

    /// Serialize the fixed header and append the payload verbatim.
    /// Deterministic; output length is `HEADER_SIZE + payload.len()`.
    pub fn marshal(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(HEADER_SIZE + self.payload.len());

        raw.extend_from_slice(&self.id.to_be_bytes());
        raw.extend_from_slice(&self.account_id.to_be_bytes());

        raw.extend_from_slice(&self.group_bits.to_be_bytes());
        raw.extend_from_slice(&self.access_bits.to_be_bytes());
        raw.extend_from_slice(&self.flags_bits.to_be_bytes());

        raw.extend_from_slice(&(self.created.timestamp() as u64).to_be_bytes());
        raw.extend_from_slice(&(self.activated.timestamp() as u64).to_be_bytes());
        raw.extend_from_slice(&(self.expired.timestamp() as u64).to_be_bytes());

        raw.extend_from_slice(&self.service.to_be_bytes());
        raw.extend_from_slice(&self.ip4.octets());

        raw.extend_from_slice(&self.payload);
        raw
    }

    /// Marshal and seal into an opaque binary blob.
    pub fn encode(&self, envelope: &Envelope) -> Result<Vec<u8>, TokenError> {
        envelope.seal(&self.marshal())
    }

    /// Marshal, seal and render as tagged text in the chosen format.
    pub fn encode_text(
        &self,
        envelope: &Envelope,
        format: TextFormat,
    ) -> Result<String, TokenError> {
        let sealed = self.encode(envelope)?;
        Ok(match format {
            TextFormat::Base64 => format!("{TAG_BASE64}{}", BASE64.encode(&sealed)),
            TextFormat::Hex => format!("{TAG_HEX}{}", hex::encode(&sealed)),
            TextFormat::Ascii85 => format!("{TAG_ASCII85}{}", ascii85::encode(&sealed)),
        })
    }

    /// Parse a tagged text token back into a [`Token`].
    ///
    /// A malformed tag or body, an undersized buffer on either side of
    /// decryption, or a zero `id`/`account_id`/`service` after successful
    /// authentication all reject with [`TokenError::InvalidToken`].
    pub fn decode(text: &str, envelope: &Envelope) -> Result<Token, TokenError> {
        let sealed = decode_text(text)?;
        let raw = envelope.open(&sealed)?;
        let token = Token::unmarshal(&raw)?;

        if token.service == 0 || token.id == 0 || token.account_id == 0 {
            return Err(TokenError::InvalidToken);
        }

        Ok(token)
    }

    fn unmarshal(raw: &[u8]) -> Result<Token, TokenError> {
        if raw.len() < HEADER_SIZE {
            return Err(TokenError::InvalidToken);
        }

        Ok(Token {
            id: be_u64(&raw[0..]),
            account_id: be_u64(&raw[8..]),

            group_bits: be_u64(&raw[16..]),
            access_bits: be_u64(&raw[24..]),
            flags_bits: be_u64(&raw[32..]),

            created: unix(be_u64(&raw[40..]) as i64),
            activated: unix(be_u64(&raw[48..]) as i64),
            expired: unix(be_u64(&raw[56..]) as i64),

            service: i32::from_be_bytes([raw[64], raw[65], raw[66], raw[67]]),
            ip4: Ipv4Addr::new(raw[68], raw[69], raw[70], raw[71]),

            payload: raw[HEADER_SIZE..].to_vec(),
        })
    }

    /// A token is active strictly between `activated` and `expired`;
    /// at either exact instant it is inactive.
    pub fn is_active(&self) -> bool {
        let now = Utc::now();
        now > self.activated && now < self.expired
    }

    /// Caller-facing validity check for decoded or stored tokens.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.id == 0 {
            return Err(TokenError::TokenIsEmpty);
        }
        if self.expired > DateTime::UNIX_EPOCH && Utc::now() >= self.expired {
            return Err(TokenError::TokenIsExpired);
        }
        Ok(())
    }

    /// Day-of-year bucket of the issue date, modulo 365.
    pub fn epoch(&self) -> u16 {
        (self.created.ordinal() % 365) as u16
    }
}

fn decode_text(text: &str) -> Result<Vec<u8>, TokenError> {
    if text.len() <= TAG_LEN {
        return Err(TokenError::InvalidToken);
    }

    let (tag, body) = text.split_at(TAG_LEN);
    let raw = match tag {
        TAG_BASE64 => BASE64.decode(body).map_err(|_| TokenError::InvalidToken)?,
        TAG_HEX => hex::decode(body).map_err(|_| TokenError::InvalidToken)?,
        TAG_ASCII85 => ascii85::decode(body)?,
        _ => return Err(TokenError::InvalidToken),
    };

    if raw.len() < HEADER_SIZE {
        return Err(TokenError::InvalidToken);
    }

    Ok(raw)
}

fn be_u64(raw: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&raw[..8]);
    u64::from_be_bytes(buf)
}

fn unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn envelope() -> Envelope {
        Envelope::new(b"grtfndgclktyzbag").unwrap()
    }

    fn sample() -> Token {
        Token {
            id: 45645,
            account_id: 18574,
            service: 567,
            ..Token::default()
        }
    }

    #[test]
    fn marshal_layout_is_fixed_offset_big_endian() {
        let token = Token {
            id: 0x0102030405060708,
            account_id: 0x1112131415161718,
            group_bits: 0x2122232425262728,
            access_bits: 0x3132333435363738,
            flags_bits: 0x4142434445464748,
            created: unix(0x51525354),
            activated: unix(0x61626364),
            expired: unix(0x71727374),
            service: 0x01020304,
            ip4: Ipv4Addr::new(157, 52, 36, 89),
            payload: b"tail".to_vec(),
        };

        let raw = token.marshal();
        assert_eq!(raw.len(), HEADER_SIZE + 4);
        assert_eq!(&raw[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&raw[8..16], &[0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18]);
        assert_eq!(&raw[40..48], &[0, 0, 0, 0, 0x51, 0x52, 0x53, 0x54]);
        assert_eq!(&raw[64..68], &[1, 2, 3, 4]);
        assert_eq!(&raw[68..72], &[157, 52, 36, 89]);
        assert_eq!(&raw[72..], b"tail");
    }

    #[test]
    fn roundtrip_all_formats() {
        let envelope = envelope();
        let token = sample();

        for format in [TextFormat::Base64, TextFormat::Hex, TextFormat::Ascii85] {
            let text = token.encode_text(&envelope, format).unwrap();
            let decoded = Token::decode(&text, &envelope).unwrap();
            assert_eq!(decoded.marshal(), token.marshal(), "{format:?}");
        }
    }

    #[test]
    fn new_token_has_time_derived_id() {
        let token = Token::new();
        assert_ne!(token.id, 0);
        assert!(token.created > DateTime::UNIX_EPOCH);
        assert!(token.payload.is_empty());
    }

    #[test]
    fn decode_rejects_zero_invariants() {
        let envelope = envelope();

        for broken in [
            Token { service: 0, ..sample() },
            Token { id: 0, ..sample() },
            Token { account_id: 0, ..sample() },
        ] {
            let text = broken.encode_text(&envelope, TextFormat::Base64).unwrap();
            assert!(matches!(
                Token::decode(&text, &envelope),
                Err(TokenError::InvalidToken)
            ));
        }
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let envelope = envelope();
        let text = sample().encode_text(&envelope, TextFormat::Base64).unwrap();
        let retagged = format!("99{}", &text[2..]);
        assert!(matches!(
            Token::decode(&retagged, &envelope),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn decode_rejects_short_text() {
        let envelope = envelope();
        for text in ["", "1", "10", "20", "30"] {
            assert!(matches!(
                Token::decode(text, &envelope),
                Err(TokenError::InvalidToken)
            ));
        }
    }

    #[test]
    fn decode_rejects_undersized_sealed_body() {
        let envelope = envelope();
        // Well-formed hex, but far fewer than HEADER_SIZE bytes inside.
        let text = format!("20{}", hex::encode([0u8; 16]));
        assert!(matches!(
            Token::decode(&text, &envelope),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn decode_rejects_tampered_body() {
        let envelope = envelope();
        let sealed = sample().encode(&envelope).unwrap();

        let mut tampered = sealed.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        let text = format!("20{}", hex::encode(&tampered));
        assert!(matches!(
            Token::decode(&text, &envelope),
            Err(TokenError::Decrypt)
        ));
    }

    #[test]
    fn decode_rejects_wrong_key() {
        let text = sample()
            .encode_text(&envelope(), TextFormat::Hex)
            .unwrap();
        let other = Envelope::new(b"0000000000000000").unwrap();
        assert!(matches!(
            Token::decode(&text, &other),
            Err(TokenError::Decrypt)
        ));
    }

    #[test]
    fn payload_and_ip_survive_roundtrip() {
        let envelope = envelope();
        let token = Token {
            ip4: Ipv4Addr::new(157, 52, 36, 89),
            payload: b"hello!".to_vec(),
            ..sample()
        };

        let text = token.encode_text(&envelope, TextFormat::Ascii85).unwrap();
        let decoded = Token::decode(&text, &envelope).unwrap();

        assert_eq!(decoded.payload, b"hello!");
        assert_eq!(decoded.ip4.to_string(), "157.52.36.89");
    }

    #[test]
    fn absent_ip_decodes_to_zero_address() {
        let envelope = envelope();
        let text = sample().encode_text(&envelope, TextFormat::Base64).unwrap();
        let decoded = Token::decode(&text, &envelope).unwrap();
        assert_eq!(decoded.ip4, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn is_active_is_strict_at_both_bounds() {
        let now = Utc::now();

        let active = Token {
            activated: now - TimeDelta::seconds(10),
            expired: now + TimeDelta::seconds(10),
            ..sample()
        };
        assert!(active.is_active());

        let not_yet = Token {
            activated: now + TimeDelta::seconds(10),
            expired: now + TimeDelta::seconds(20),
            ..sample()
        };
        assert!(!not_yet.is_active());

        let past = Token {
            activated: now - TimeDelta::seconds(20),
            expired: now - TimeDelta::seconds(10),
            ..sample()
        };
        assert!(!past.is_active());

        // Equality at the expiry bound is inactive.
        let at_bound = Token {
            activated: now - TimeDelta::seconds(10),
            expired: now,
            ..sample()
        };
        assert!(!at_bound.is_active());
    }

    #[test]
    fn validate_flags_empty_and_expired() {
        assert!(matches!(
            Token::default().validate(),
            Err(TokenError::TokenIsEmpty)
        ));

        let expired = Token {
            expired: Utc::now() - TimeDelta::seconds(1),
            ..sample()
        };
        assert!(matches!(
            expired.validate(),
            Err(TokenError::TokenIsExpired)
        ));

        let open_ended = sample();
        assert!(open_ended.validate().is_ok());
    }
}
