//! `buffer` shim: `Buffer` as a `Uint8Array` subclass with host-side
//! string codecs.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use rquickjs::{Ctx, Exception, Function, Object};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "buffer";

/// Largest buffer the guest may allocate.
pub const MAX_LENGTH: u32 = 0x7fff_ffff;

const BUFFER_SOURCE: &str = r#"(function (encode, decode) {
    class Buffer extends Uint8Array {
        static from(value, encodingOrOffset, length) {
            if (typeof value === 'string') {
                return new Buffer(encode(value, encodingOrOffset || 'utf8'));
            }
            if (value instanceof ArrayBuffer) {
                return new Buffer(value, encodingOrOffset || 0, length);
            }
            if (value && value.type === 'Buffer' && Array.isArray(value.data)) {
                return new Buffer(value.data);
            }
            return new Buffer(Array.from(value));
        }
        static alloc(size, fill) {
            const buffer = new Buffer(size);
            if (fill !== undefined) {
                buffer.fill(typeof fill === 'string' ? encode(fill, 'utf8')[0] : fill);
            }
            return buffer;
        }
        static allocUnsafe(size) {
            return new Buffer(size);
        }
        static isBuffer(value) {
            return value instanceof Buffer;
        }
        static isEncoding(encoding) {
            try {
                decode([], String(encoding));
                return true;
            } catch (e) {
                return false;
            }
        }
        static byteLength(value, encoding) {
            return typeof value === 'string' ? encode(value, encoding || 'utf8').length : value.byteLength;
        }
        static concat(list, totalLength) {
            const total = totalLength === undefined
                ? list.reduce((sum, b) => sum + b.length, 0)
                : totalLength;
            const out = new Buffer(total);
            let offset = 0;
            for (const b of list) {
                if (offset >= total) {
                    break;
                }
                out.set(b.subarray(0, total - offset), offset);
                offset += b.length;
            }
            return out;
        }
        toString(encoding, start, end) {
            const from = start === undefined ? 0 : start;
            const to = end === undefined ? this.length : end;
            return decode(Array.from(this.subarray(from, to)), encoding || 'utf8');
        }
        toJSON() {
            return { type: 'Buffer', data: Array.from(this) };
        }
        equals(other) {
            if (this.length !== other.length) {
                return false;
            }
            return this.every((b, i) => b === other[i]);
        }
        write(string, offset, length, encoding) {
            const bytes = encode(string, encoding || 'utf8');
            const at = offset || 0;
            const count = Math.min(bytes.length, length === undefined ? this.length - at : length);
            this.set(bytes.slice(0, count), at);
            return count;
        }
    }
    return Buffer;
})"#;

/// Encodings understood by `Buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Base64,
    Base64Url,
    Hex,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Some(Self::Utf8),
            "base64" => Some(Self::Base64),
            "base64url" => Some(Self::Base64Url),
            "hex" => Some(Self::Hex),
            "latin1" | "binary" => Some(Self::Latin1),
            "ascii" => Some(Self::Ascii),
            _ => None,
        }
    }

    /// Converts guest text into bytes.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Base64 | Self::Base64Url => {
                // Node accepts either alphabet and ignores what it cannot decode.
                let normalized: String = text
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '=')
                    .map(|c| match c {
                        '-' => '+',
                        '_' => '/',
                        c => c,
                    })
                    .collect();
                lenient_base64().decode(normalized).unwrap_or_default()
            }
            Self::Hex => {
                let mut bytes = Vec::with_capacity(text.len() / 2);
                for pair in text.as_bytes().chunks_exact(2) {
                    match hex::decode(pair) {
                        Ok(byte) => bytes.extend(byte),
                        Err(_) => break,
                    }
                }
                bytes
            }
            Self::Latin1 | Self::Ascii => text.chars().map(|c| c as u32 as u8).collect(),
        }
    }

    /// Converts bytes into guest text.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
            Self::Base64Url => base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes),
            Self::Hex => hex::encode(bytes),
            Self::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Self::Ascii => bytes.iter().map(|&b| (b & 0x7f) as char).collect(),
        }
    }
}

fn lenient_base64() -> GeneralPurpose {
    GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
            .with_decode_allow_trailing_bits(true),
    )
}

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    let exports: Object = require.require(MODULE_NAME)?;
    let buffer: Function = exports.get("Buffer")?;
    ctx.globals().set("Buffer", buffer)
}

fn encoding<'js>(ctx: &Ctx<'js>, name: &str) -> rquickjs::Result<Encoding> {
    Encoding::parse(name)
        .ok_or_else(|| Exception::throw_type(ctx, &format!("Unknown encoding: {name}")))
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    // Bytes cross the boundary as plain arrays of numbers.
    let encode = Function::new(ctx.clone(), |ctx: Ctx<'js>, text: String, name: String| {
        let bytes = encoding(&ctx, &name)?.encode(&text);
        Ok::<_, rquickjs::Error>(bytes.into_iter().map(i32::from).collect::<Vec<_>>())
    })?
    .with_name("encode")?;
    let decode = Function::new(ctx.clone(), |ctx: Ctx<'js>, bytes: Vec<i32>, name: String| {
        let bytes: Vec<u8> = bytes.into_iter().map(|b| b as u8).collect();
        Ok::<_, rquickjs::Error>(encoding(&ctx, &name)?.decode(&bytes))
    })?
    .with_name("decode")?;

    let buffer: Function = js::glue(ctx, "node:buffer", BUFFER_SOURCE, (encode, decode))?;
    exports.set("Buffer", buffer)?;
    exports.set("kMaxLength", MAX_LENGTH)?;
    exports.set("constants", {
        let constants = Object::new(ctx.clone())?;
        constants.set("MAX_LENGTH", MAX_LENGTH)?;
        constants
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_modules;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::utf8("Buffer.from('héllo').toString()", "héllo")]
    #[case::to_base64("Buffer.from('hello').toString('base64')", "aGVsbG8=")]
    #[case::from_base64("Buffer.from('aGVsbG8', 'base64').toString('utf8')", "hello")]
    #[case::base64url("Buffer.from('hi?>', 'utf8').toString('base64url')", "aGk_Pg")]
    #[case::hex("Buffer.from('0aff', 'hex').toString('hex')", "0aff")]
    #[case::hex_stops_at_invalid("Buffer.from('0azz', 'hex').length + ''", "1")]
    #[case::latin1("Buffer.from([0xe9]).toString('latin1')", "é")]
    #[case::concat("Buffer.concat([Buffer.from('ab'), Buffer.from('cd')]).toString()", "abcd")]
    #[case::slice("Buffer.from('openapi').toString('utf8', 0, 4)", "open")]
    #[case::json("JSON.stringify(Buffer.from('hi'))", r#"{"type":"Buffer","data":[104,105]}"#)]
    fn test_buffer(#[case] script: &str, #[case] expected: &str) {
        with_modules(&[installer()], |ctx, _require| {
            let result: String = ctx.eval(script).unwrap();
            assert_eq!(result, expected);
        });
    }

    #[test]
    fn test_buffer_is_uint8array() {
        with_modules(&[installer()], |ctx, _require| {
            let ok: bool = ctx
                .eval(
                    r#"
                    var b = Buffer.alloc(3, 1);
                    b instanceof Uint8Array && Buffer.isBuffer(b) && b[2] === 1
                        && require('node:buffer').Buffer === Buffer
                        && Buffer.byteLength('é') === 2
                        && Buffer.isEncoding('hex') && !Buffer.isEncoding('utf16')
                        && Buffer.from('ab').equals(Buffer.from('ab'))
                    "#,
                )
                .unwrap();
            assert!(ok);
        });
    }

    #[test]
    fn test_unknown_encoding_throws() {
        with_modules(&[installer()], |ctx, _require| {
            let name: String = ctx
                .eval("(function () { try { Buffer.from('x', 'utf16'); } catch (e) { return e.name; } })()")
                .unwrap();
            assert_eq!(name, "TypeError");
        });
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!(Encoding::parse("UTF-8"), Some(Encoding::Utf8));
        assert_eq!(Encoding::parse("binary"), Some(Encoding::Latin1));
        assert_eq!(Encoding::parse("ucs2"), None);
    }
}
