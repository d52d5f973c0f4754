//! Decoding of inbound SMS protocol data units.
//!
//! Handles 3GPP SMS-DELIVER PDUs as delivered by the platform, i.e. with the
//! service centre address in front.

use chrono::NaiveDate;
use thiserror::Error;

/// One decoded inbound message fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPdu {
    pub originating_address: String,
    pub body: String,
    pub timestamp_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported pdu format: {0}")]
    UnsupportedFormat(String),

    #[error("pdu truncated at offset {0}")]
    Truncated(usize),

    #[error("not an SMS-DELIVER pdu (message type indicator {0})")]
    NotDeliver(u8),

    #[error("invalid service centre timestamp")]
    InvalidTimestamp,

    #[error("invalid UCS-2 text")]
    InvalidText,

    #[error("invalid pdu hex: {0}")]
    InvalidHex(String),
}

/// Turns one raw PDU into a message fragment.
pub trait PduDecoder: Send + Sync {
    fn decode(&self, pdu: &[u8], format: Option<&str>) -> Result<DecodedPdu, DecodeError>;
}

/// Decoder for GSM (3GPP) SMS-DELIVER PDUs.
#[derive(Debug, Default, Clone, Copy)]
pub struct GsmPduDecoder;

impl PduDecoder for GsmPduDecoder {
    fn decode(&self, pdu: &[u8], format: Option<&str>) -> Result<DecodedPdu, DecodeError> {
        match format {
            None | Some("3gpp") => {}
            Some(other) => return Err(DecodeError::UnsupportedFormat(other.to_string())),
        }

        let mut reader = Reader::new(pdu);

        let smsc_len = usize::from(reader.byte()?);
        reader.take(smsc_len)?;

        let first = reader.byte()?;
        let mti = first & 0x03;
        if mti != 0 {
            return Err(DecodeError::NotDeliver(mti));
        }
        let has_header = first & 0x40 != 0;

        let address_digits = usize::from(reader.byte()?);
        let type_of_address = reader.byte()?;
        let address = reader.take(address_digits.div_ceil(2))?;
        let originating_address = decode_address(address, address_digits, type_of_address)?;

        let _protocol_id = reader.byte()?;
        let coding = Alphabet::from_dcs(reader.byte()?);
        let timestamp_millis = decode_timestamp(reader.take(7)?)?;

        let user_data_len = usize::from(reader.byte()?);
        let user_data = reader.rest();
        let body = decode_user_data(user_data, user_data_len, has_header, coding)?;

        Ok(DecodedPdu {
            originating_address,
            body,
            timestamp_millis,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + n;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        rest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alphabet {
    Gsm7,
    EightBit,
    Ucs2,
}

impl Alphabet {
    fn from_dcs(dcs: u8) -> Self {
        match dcs >> 4 {
            // General data coding, with or without automatic deletion.
            0x0..=0x7 => match (dcs >> 2) & 0x03 {
                0x01 => Alphabet::EightBit,
                0x02 => Alphabet::Ucs2,
                _ => Alphabet::Gsm7,
            },
            0xE => Alphabet::Ucs2,
            0xF if dcs & 0x04 != 0 => Alphabet::EightBit,
            _ => Alphabet::Gsm7,
        }
    }
}

fn decode_address(bytes: &[u8], digits: usize, type_of_address: u8) -> Result<String, DecodeError> {
    match type_of_address & 0x70 {
        0x50 => {
            let septets = unpack_septets(bytes, digits * 4 / 7, 0)?;
            Ok(gsm_to_string(&septets))
        }
        number_type => {
            let mut address = String::with_capacity(digits + 1);
            if number_type == 0x10 {
                address.push('+');
            }
            let nibbles = bytes.iter().flat_map(|b| [b & 0x0F, b >> 4]);
            for nibble in nibbles.take(digits) {
                match nibble {
                    0x0..=0x9 => address.push(char::from(b'0' + nibble)),
                    0xA => address.push('*'),
                    0xB => address.push('#'),
                    0xC => address.push('a'),
                    0xD => address.push('b'),
                    0xE => address.push('c'),
                    _ => break,
                }
            }
            Ok(address)
        }
    }
}

/// Service centre timestamp: seven swapped-BCD octets, the last one the
/// offset from UTC in quarter hours.
fn decode_timestamp(scts: &[u8]) -> Result<i64, DecodeError> {
    let bcd = |b: u8| u32::from(b & 0x0F) * 10 + u32::from(b >> 4);

    let year = bcd(scts[0]) as i32;
    let year = if year >= 90 { 1900 + year } else { 2000 + year };

    let zone = scts[6];
    let quarters = i64::from(zone & 0x07) * 10 + i64::from(zone >> 4);
    let offset_minutes = if zone & 0x08 != 0 { -quarters * 15 } else { quarters * 15 };

    let local = NaiveDate::from_ymd_opt(year, bcd(scts[1]), bcd(scts[2]))
        .and_then(|date| date.and_hms_opt(bcd(scts[3]), bcd(scts[4]), bcd(scts[5])))
        .ok_or(DecodeError::InvalidTimestamp)?;

    Ok(local.and_utc().timestamp_millis() - offset_minutes * 60_000)
}

fn decode_user_data(
    data: &[u8],
    length: usize,
    has_header: bool,
    alphabet: Alphabet,
) -> Result<String, DecodeError> {
    let header_octets = if has_header {
        let udhl = *data.first().ok_or(DecodeError::Truncated(0))?;
        usize::from(udhl) + 1
    } else {
        0
    };

    match alphabet {
        Alphabet::Gsm7 => {
            // `length` counts septets, header included.
            let header_septets = (header_octets * 8).div_ceil(7);
            let septets = unpack_septets(data, length, header_septets)?;
            Ok(gsm_to_string(&septets))
        }
        Alphabet::EightBit => {
            let octets = data
                .get(header_octets..length)
                .ok_or(DecodeError::Truncated(data.len()))?;
            Ok(octets.iter().map(|&b| char::from(b)).collect())
        }
        Alphabet::Ucs2 => {
            let octets = data
                .get(header_octets..length)
                .ok_or(DecodeError::Truncated(data.len()))?;
            if octets.len() % 2 != 0 {
                return Err(DecodeError::Truncated(length));
            }
            let units: Vec<u16> = octets
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|_| DecodeError::InvalidText)
        }
    }
}

/// Unpack septets `skip..count` from packed 7-bit data.
fn unpack_septets(data: &[u8], count: usize, skip: usize) -> Result<Vec<u8>, DecodeError> {
    (skip..count)
        .map(|i| {
            let bit = i * 7;
            let index = bit / 8;
            let shift = bit % 8;
            let low = u16::from(*data.get(index).ok_or(DecodeError::Truncated(index))?);
            let high = if shift > 1 {
                u16::from(*data.get(index + 1).ok_or(DecodeError::Truncated(index + 1))?)
            } else {
                0
            };
            Ok((((high << 8) | low) >> shift) as u8 & 0x7F)
        })
        .collect()
}

const ESCAPE: u8 = 0x1B;

#[rustfmt::skip]
const GSM_BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å',
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', ' ', 'Æ', 'æ', 'ß', 'É',
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§',
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à',
];

fn gsm_extension(septet: u8) -> Option<char> {
    Some(match septet {
        0x0A => '\u{0C}',
        0x14 => '^',
        0x28 => '{',
        0x29 => '}',
        0x2F => '\\',
        0x3C => '[',
        0x3D => '~',
        0x3E => ']',
        0x40 => '|',
        0x65 => '€',
        _ => return None,
    })
}

fn gsm_to_string(septets: &[u8]) -> String {
    let mut text = String::with_capacity(septets.len());
    let mut iter = septets.iter().copied();
    while let Some(septet) = iter.next() {
        if septet == ESCAPE {
            if let Some(next) = iter.next() {
                text.push(gsm_extension(next).unwrap_or(GSM_BASIC[usize::from(next)]));
            }
        } else {
            text.push(GSM_BASIC[usize::from(septet)]);
        }
    }
    text
}

/// Septets needed to encode `text` in the GSM 7-bit alphabet, or `None` when
/// some character has to go out as UCS-2.
pub fn gsm_septet_count(text: &str) -> Option<usize> {
    text.chars().try_fold(0, |count, c| {
        if GSM_BASIC.contains(&c) {
            Some(count + 1)
        } else if (0..0x80).any(|septet| gsm_extension(septet) == Some(c)) {
            Some(count + 2)
        } else {
            None
        }
    })
}
