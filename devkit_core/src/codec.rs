//! Codec registry: paired encode/decode transforms over text.
//!
//! Every codec satisfies `decode(encode(x)) == x` for any UTF-8 `x`. Decoding
//! never panics on user input; malformed input is reported as
//! [`ErrorKind::InvalidEncoding`](crate::error::ErrorKind::InvalidEncoding).
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use ascii85::{decode as ascii85_decode, encode as ascii85_encode};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use data_encoding::BASE32;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::CodecError;

/// Outcome of a codec call.
pub type CodecResult = Result<String, CodecError>;

/// Characters `encodeURIComponent` leaves untouched, besides alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    Base64,
    Base64Url,
    Base32,
    Ascii85,
    Url,
    FormUrl,
    Hex,
    Binary,
    HtmlEntity,
    BackslashEscape,
}

impl Codec {
    pub const ALL: [Codec; 10] = [
        Codec::Base64,
        Codec::Base64Url,
        Codec::Base32,
        Codec::Ascii85,
        Codec::Url,
        Codec::FormUrl,
        Codec::Hex,
        Codec::Binary,
        Codec::HtmlEntity,
        Codec::BackslashEscape,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Base64Url => "base64url",
            Self::Base32 => "base32",
            Self::Ascii85 => "ascii85",
            Self::Url => "url",
            Self::FormUrl => "form_url",
            Self::Hex => "hex",
            Self::Binary => "binary",
            Self::HtmlEntity => "html_entity",
            Self::BackslashEscape => "backslash_escape",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        Codec::ALL
            .into_iter()
            .find(|codec| codec.name() == wanted)
            .or(match wanted.as_str() {
                "html" | "html_entities" => Some(Codec::HtmlEntity),
                "escape" | "backslash" => Some(Codec::BackslashEscape),
                "base64_url" => Some(Codec::Base64Url),
                _ => None,
            })
            .ok_or_else(|| CodecError::unsupported(format!("unsupported codec {s}")))
    }
}

pub fn encode(codec: Codec, input: &str) -> CodecResult {
    tracing::debug!(codec = codec.name(), len = input.len(), "encode");
    let data = input.as_bytes();
    let out = match codec {
        Codec::Base64 => STANDARD.encode(data),
        Codec::Base64Url => URL_SAFE_NO_PAD.encode(data),
        Codec::Base32 => BASE32.encode(data),
        Codec::Ascii85 => ascii85_encode(data),
        Codec::Url => utf8_percent_encode(input, URI_COMPONENT).to_string(),
        Codec::FormUrl => urlencoding::encode(input).replace("%20", "+"),
        Codec::Hex => data
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<Vec<_>>()
            .join(" "),
        Codec::Binary => data
            .iter()
            .map(|byte| format!("{byte:08b}"))
            .collect::<Vec<_>>()
            .join(" "),
        Codec::HtmlEntity => encode_html_entities(input),
        Codec::BackslashEscape => escape_backslashes(input),
    };
    Ok(out)
}

pub fn decode(codec: Codec, input: &str) -> CodecResult {
    tracing::debug!(codec = codec.name(), len = input.len(), "decode");
    let trimmed = input.trim();
    match codec {
        Codec::Base64 => STANDARD
            .decode(trimmed.as_bytes())
            .map_err(|err| CodecError::invalid(err.to_string()))
            .and_then(utf8),
        Codec::Base64Url => URL_SAFE_NO_PAD
            .decode(trimmed.trim_end_matches('=').as_bytes())
            .map_err(|err| CodecError::invalid(err.to_string()))
            .and_then(utf8),
        Codec::Base32 => BASE32
            .decode(trimmed.as_bytes())
            .map_err(|err| CodecError::invalid(err.to_string()))
            .and_then(utf8),
        Codec::Ascii85 => ascii85_decode(trimmed)
            .map_err(|err| CodecError::invalid(err.to_string()))
            .and_then(utf8),
        Codec::Url => {
            check_percent_sequences(input)?;
            percent_decode_str(input)
                .decode_utf8()
                .map(|cow| cow.into_owned())
                .map_err(|_| CodecError::invalid("percent-decoded bytes are not valid UTF-8"))
        }
        Codec::FormUrl => {
            check_percent_sequences(input)?;
            let normalized = input.replace('+', " ");
            urlencoding::decode(&normalized)
                .map(|cow| cow.into_owned())
                .map_err(|_| CodecError::invalid("percent-decoded bytes are not valid UTF-8"))
        }
        Codec::Hex => decode_tokens(trimmed, 2, 16).and_then(utf8),
        Codec::Binary => decode_tokens(trimmed, 8, 2).and_then(utf8),
        Codec::HtmlEntity => Ok(decode_html_entities(input)),
        Codec::BackslashEscape => Ok(unescape_backslashes(input)),
    }
}

/// Encodes `input` with every registered codec, keyed by codec name.
pub fn encode_all(input: &str) -> BTreeMap<String, String> {
    Codec::ALL
        .into_iter()
        .filter_map(|codec| {
            encode(codec, input)
                .ok()
                .map(|out| (codec.name().to_string(), out))
        })
        .collect()
}

fn utf8(bytes: Vec<u8>) -> CodecResult {
    String::from_utf8(bytes).map_err(|_| CodecError::invalid("decoded bytes are not valid UTF-8"))
}

fn check_percent_sequences(input: &str) -> Result<(), CodecError> {
    let bytes = input.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let valid = bytes.len() > idx + 2
                && bytes[idx + 1].is_ascii_hexdigit()
                && bytes[idx + 2].is_ascii_hexdigit();
            if !valid {
                return Err(CodecError::invalid(format!(
                    "malformed percent sequence at byte {idx}"
                )));
            }
            idx += 3;
        } else {
            idx += 1;
        }
    }
    Ok(())
}

fn decode_tokens(input: &str, width: usize, radix: u32) -> Result<Vec<u8>, CodecError> {
    input
        .split_whitespace()
        .map(|token| {
            if token.len() != width || !token.chars().all(|c| c.is_digit(radix)) {
                return Err(CodecError::invalid(format!(
                    "token '{token}' must be exactly {width} digits"
                )));
            }
            u8::from_str_radix(token, radix)
                .map_err(|_| CodecError::invalid(format!("token '{token}' is not base {radix}")))
        })
        .collect()
}

fn escape_backslashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

// Unknown sequences such as `\q` are kept verbatim.
fn unescape_backslashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let replacement = match chars.peek() {
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            _ => {
                out.push('\\');
                continue;
            }
        };
        chars.next();
        out.push(replacement);
    }
    out
}

/// Escapes markup-significant characters and any character with a named entity.
pub fn encode_html_entities(input: &str) -> String {
    let names = entity_names();
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c if !c.is_ascii() => match names.get(&c) {
                Some(name) => {
                    out.push('&');
                    out.push_str(name);
                    out.push(';');
                }
                None => out.push(c),
            },
            c => out.push(c),
        }
    }
    out
}

/// Resolves named and numeric character references. Unknown references are
/// left as written; nothing is interpreted as markup.
pub fn decode_html_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let resolved = tail
            .char_indices()
            .take(34)
            .find(|(_, c)| *c == ';')
            .and_then(|(semi, _)| resolve_entity(&tail[1..semi]).map(|ch| (ch, semi)));
        match resolved {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    entity_chars().get(name).copied()
}

fn entity_chars() -> &'static HashMap<&'static str, char> {
    static TABLE: OnceLock<HashMap<&'static str, char>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map: HashMap<&'static str, char> = ENTITIES.iter().copied().collect();
        map.insert("amp", '&');
        map.insert("lt", '<');
        map.insert("gt", '>');
        map.insert("quot", '"');
        map.insert("apos", '\'');
        map
    })
}

fn entity_names() -> &'static HashMap<char, &'static str> {
    static TABLE: OnceLock<HashMap<char, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| ENTITIES.iter().map(|(name, ch)| (*ch, *name)).collect())
}

// HTML 4 named entities outside ASCII.
const ENTITIES: &[(&str, char)] = &[
    ("nbsp", '\u{a0}'),
    ("iexcl", '¡'),
    ("cent", '¢'),
    ("pound", '£'),
    ("curren", '¤'),
    ("yen", '¥'),
    ("brvbar", '¦'),
    ("sect", '§'),
    ("uml", '¨'),
    ("copy", '©'),
    ("ordf", 'ª'),
    ("laquo", '«'),
    ("not", '¬'),
    ("shy", '\u{ad}'),
    ("reg", '®'),
    ("macr", '¯'),
    ("deg", '°'),
    ("plusmn", '±'),
    ("sup2", '²'),
    ("sup3", '³'),
    ("acute", '´'),
    ("micro", 'µ'),
    ("para", '¶'),
    ("middot", '·'),
    ("cedil", '¸'),
    ("sup1", '¹'),
    ("ordm", 'º'),
    ("raquo", '»'),
    ("frac14", '¼'),
    ("frac12", '½'),
    ("frac34", '¾'),
    ("iquest", '¿'),
    ("Agrave", 'À'),
    ("Aacute", 'Á'),
    ("Acirc", 'Â'),
    ("Atilde", 'Ã'),
    ("Auml", 'Ä'),
    ("Aring", 'Å'),
    ("AElig", 'Æ'),
    ("Ccedil", 'Ç'),
    ("Egrave", 'È'),
    ("Eacute", 'É'),
    ("Ecirc", 'Ê'),
    ("Euml", 'Ë'),
    ("Igrave", 'Ì'),
    ("Iacute", 'Í'),
    ("Icirc", 'Î'),
    ("Iuml", 'Ï'),
    ("ETH", 'Ð'),
    ("Ntilde", 'Ñ'),
    ("Ograve", 'Ò'),
    ("Oacute", 'Ó'),
    ("Ocirc", 'Ô'),
    ("Otilde", 'Õ'),
    ("Ouml", 'Ö'),
    ("times", '×'),
    ("Oslash", 'Ø'),
    ("Ugrave", 'Ù'),
    ("Uacute", 'Ú'),
    ("Ucirc", 'Û'),
    ("Uuml", 'Ü'),
    ("Yacute", 'Ý'),
    ("THORN", 'Þ'),
    ("szlig", 'ß'),
    ("agrave", 'à'),
    ("aacute", 'á'),
    ("acirc", 'â'),
    ("atilde", 'ã'),
    ("auml", 'ä'),
    ("aring", 'å'),
    ("aelig", 'æ'),
    ("ccedil", 'ç'),
    ("egrave", 'è'),
    ("eacute", 'é'),
    ("ecirc", 'ê'),
    ("euml", 'ë'),
    ("igrave", 'ì'),
    ("iacute", 'í'),
    ("icirc", 'î'),
    ("iuml", 'ï'),
    ("eth", 'ð'),
    ("ntilde", 'ñ'),
    ("ograve", 'ò'),
    ("oacute", 'ó'),
    ("ocirc", 'ô'),
    ("otilde", 'õ'),
    ("ouml", 'ö'),
    ("divide", '÷'),
    ("oslash", 'ø'),
    ("ugrave", 'ù'),
    ("uacute", 'ú'),
    ("ucirc", 'û'),
    ("uuml", 'ü'),
    ("yacute", 'ý'),
    ("thorn", 'þ'),
    ("yuml", 'ÿ'),
    ("OElig", 'Œ'),
    ("oelig", 'œ'),
    ("Scaron", 'Š'),
    ("scaron", 'š'),
    ("Yuml", 'Ÿ'),
    ("fnof", 'ƒ'),
    ("circ", 'ˆ'),
    ("tilde", '˜'),
    ("Alpha", 'Α'),
    ("Beta", 'Β'),
    ("Gamma", 'Γ'),
    ("Delta", 'Δ'),
    ("Epsilon", 'Ε'),
    ("Zeta", 'Ζ'),
    ("Eta", 'Η'),
    ("Theta", 'Θ'),
    ("Iota", 'Ι'),
    ("Kappa", 'Κ'),
    ("Lambda", 'Λ'),
    ("Mu", 'Μ'),
    ("Nu", 'Ν'),
    ("Xi", 'Ξ'),
    ("Omicron", 'Ο'),
    ("Pi", 'Π'),
    ("Rho", 'Ρ'),
    ("Sigma", 'Σ'),
    ("Tau", 'Τ'),
    ("Upsilon", 'Υ'),
    ("Phi", 'Φ'),
    ("Chi", 'Χ'),
    ("Psi", 'Ψ'),
    ("Omega", 'Ω'),
    ("alpha", 'α'),
    ("beta", 'β'),
    ("gamma", 'γ'),
    ("delta", 'δ'),
    ("epsilon", 'ε'),
    ("zeta", 'ζ'),
    ("eta", 'η'),
    ("theta", 'θ'),
    ("iota", 'ι'),
    ("kappa", 'κ'),
    ("lambda", 'λ'),
    ("mu", 'μ'),
    ("nu", 'ν'),
    ("xi", 'ξ'),
    ("omicron", 'ο'),
    ("pi", 'π'),
    ("rho", 'ρ'),
    ("sigmaf", 'ς'),
    ("sigma", 'σ'),
    ("tau", 'τ'),
    ("upsilon", 'υ'),
    ("phi", 'φ'),
    ("chi", 'χ'),
    ("psi", 'ψ'),
    ("omega", 'ω'),
    ("thetasym", 'ϑ'),
    ("upsih", 'ϒ'),
    ("piv", 'ϖ'),
    ("ensp", '\u{2002}'),
    ("emsp", '\u{2003}'),
    ("thinsp", '\u{2009}'),
    ("zwnj", '\u{200c}'),
    ("zwj", '\u{200d}'),
    ("lrm", '\u{200e}'),
    ("rlm", '\u{200f}'),
    ("ndash", '–'),
    ("mdash", '—'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("sbquo", '‚'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("bdquo", '„'),
    ("dagger", '†'),
    ("Dagger", '‡'),
    ("bull", '•'),
    ("hellip", '…'),
    ("permil", '‰'),
    ("prime", '′'),
    ("Prime", '″'),
    ("lsaquo", '‹'),
    ("rsaquo", '›'),
    ("oline", '‾'),
    ("frasl", '⁄'),
    ("euro", '€'),
    ("image", 'ℑ'),
    ("weierp", '℘'),
    ("real", 'ℜ'),
    ("trade", '™'),
    ("alefsym", 'ℵ'),
    ("larr", '←'),
    ("uarr", '↑'),
    ("rarr", '→'),
    ("darr", '↓'),
    ("harr", '↔'),
    ("crarr", '↵'),
    ("lArr", '⇐'),
    ("uArr", '⇑'),
    ("rArr", '⇒'),
    ("dArr", '⇓'),
    ("hArr", '⇔'),
    ("forall", '∀'),
    ("part", '∂'),
    ("exist", '∃'),
    ("empty", '∅'),
    ("nabla", '∇'),
    ("isin", '∈'),
    ("notin", '∉'),
    ("ni", '∋'),
    ("prod", '∏'),
    ("sum", '∑'),
    ("minus", '−'),
    ("lowast", '∗'),
    ("radic", '√'),
    ("prop", '∝'),
    ("infin", '∞'),
    ("ang", '∠'),
    ("and", '∧'),
    ("or", '∨'),
    ("cap", '∩'),
    ("cup", '∪'),
    ("int", '∫'),
    ("there4", '∴'),
    ("sim", '∼'),
    ("cong", '≅'),
    ("asymp", '≈'),
    ("ne", '≠'),
    ("equiv", '≡'),
    ("le", '≤'),
    ("ge", '≥'),
    ("sub", '⊂'),
    ("sup", '⊃'),
    ("nsub", '⊄'),
    ("sube", '⊆'),
    ("supe", '⊇'),
    ("oplus", '⊕'),
    ("otimes", '⊗'),
    ("perp", '⊥'),
    ("sdot", '⋅'),
    ("lceil", '⌈'),
    ("rceil", '⌉'),
    ("lfloor", '⌊'),
    ("rfloor", '⌋'),
    ("lang", '〈'),
    ("rang", '〉'),
    ("loz", '◊'),
    ("spades", '♠'),
    ("clubs", '♣'),
    ("hearts", '♥'),
    ("diams", '♦'),
];
