use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

use crate::CryptoError;

/// Encode bytes with the URL-safe alphabet and no `=` padding.
pub fn encode<B>(bytes: B) -> String
where
    B: AsRef<[u8]>,
{
    let standard = BASE64_STANDARD.encode(bytes);
    let mut out = String::with_capacity(standard.len());
    for ch in standard.chars() {
        match ch {
            '+' => out.push('-'),
            '/' => out.push('_'),
            '=' => break,
            other => out.push(other),
        }
    }
    out
}

/// Decode an unpadded URL-safe base64 string.
///
/// Padding is restored and the alphabet substitution reversed before the
/// standard decoder runs, so characters from the standard alphabet (`+`, `/`)
/// and explicit padding are rejected.
pub fn decode(input: &str) -> Result<Vec<u8>, CryptoError> {
    if input.len() % 4 == 1 {
        return Err(CryptoError::MalformedEncoding(format!(
            "impossible length {}",
            input.len()
        )));
    }

    let mut standard = String::with_capacity(input.len() + 3);
    for ch in input.chars() {
        match ch {
            '-' => standard.push('+'),
            '_' => standard.push('/'),
            '+' | '/' | '=' => {
                return Err(CryptoError::MalformedEncoding(format!(
                    "unexpected character '{ch}'"
                )))
            }
            other => standard.push(other),
        }
    }
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    BASE64_STANDARD
        .decode(standard.as_bytes())
        .map_err(|err| CryptoError::MalformedEncoding(err.to_string()))
}
