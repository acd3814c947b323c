//! CQ code encoding and decoding.
//!
//! CQ codes are the inline markup spans embedded in message text to represent
//! rich content: `[CQ:at,qq=10001000]`, `[CQ:face,id=178]`, and so on. The
//! format is an open bracket, the literal `CQ:` keyword (case-insensitive),
//! the tag name, then comma-separated `key=value` attributes, closed by `]`.
//!
//! # Span matching
//!
//! [`find`], [`replace`], [`check`] and [`decode`] all locate spans the same
//! way: the first `[CQ:` opener paired with the **last** `]` in the text.
//! This greedy-to-last-bracket matching means two tags on one line are
//! treated as a single span. That is a compatibility quirk of the wire
//! dialect, kept deliberately — see `greedy_span_covers_two_tags` in the
//! tests before "fixing" it.
//!
//! # The `json` tag
//!
//! The `data` attribute of a `json` tag carries arbitrary JSON, so `,`, `&`,
//! `[` and `]` inside it are escaped by [`json`] on encode and unescaped by
//! [`decode`]. Ampersand is escaped first and unescaped last, which makes the
//! pair a true inverse for any input.

use std::collections::HashMap;
use std::fmt::Write;

/// Builds a `file:///` URL for a local file path.
pub fn file_url(path: &str) -> String {
    format!("file:///{path}")
}

/// Builds a `base64://` URL from already-encoded image data.
pub fn base64_image(encoded: &str) -> String {
    format!("base64://{encoded}")
}

/// Builds the avatar URL of a group.
pub fn group_avatar_url(group_id: i64) -> String {
    format!("https://p.qlogo.cn/gh/{group_id}/{group_id}/100")
}

/// Byte range of the CQ span in `text`, if any.
///
/// Greedy: runs from the first case-insensitive `[CQ:` to the last `]` in the
/// whole text. At least one character must sit between the keyword and the
/// closing bracket.
fn span_of(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = bytes
        .windows(4)
        .position(|w| w.eq_ignore_ascii_case(b"[CQ:"))?;
    let end = text.rfind(']')?;
    (end > start + 4).then_some((start, end + 1))
}

/// Returns the CQ spans found in `text`.
///
/// Because matching is greedy, at most one span is returned; the `Vec` shape
/// mirrors the search contract ([`check`] is true iff this is non-empty).
pub fn find(text: &str) -> Vec<&str> {
    match span_of(text) {
        Some((start, end)) => vec![&text[start..end]],
        None => Vec::new(),
    }
}

/// Replaces the CQ span in `src` with `repl`.
///
/// Text without a span is returned unchanged.
pub fn replace(src: &str, repl: &str) -> String {
    match span_of(src) {
        Some((start, end)) => format!("{}{}{}", &src[..start], repl, &src[end..]),
        None => src.to_string(),
    }
}

/// Whether `text` contains a CQ span.
pub fn check(text: &str) -> bool {
    span_of(text).is_some()
}

/// Encodes a CQ code from a tag name and ordered attributes.
///
/// Attributes are emitted in the order supplied. Values are expected in
/// their canonical string form already (numeric flags as `1`, not `true`).
pub fn encode(tag: &str, attrs: &[(&str, String)]) -> String {
    let mut code = String::new();

    code.push_str("[CQ:");
    code.push_str(tag);

    for (key, value) in attrs {
        let _ = write!(code, ",{key}={value}");
    }

    code.push(']');
    code
}

/// Decodes the first CQ span in `code` into a tag name and attribute map.
///
/// Splitting is on commas, with the first `=` separating key from value
/// (values may themselves contain `=`); duplicate keys are last-write-wins.
/// A `json` tag has its `data` attribute unescaped.
///
/// Text with no span yields an empty tag name and an empty map — callers
/// detect "not a tag" by checking tag-name emptiness, not by an error.
pub fn decode(code: &str) -> (String, HashMap<String, String>) {
    let mut tag = String::new();
    let mut attrs = HashMap::new();

    let Some((start, end)) = span_of(code) else {
        return (tag, attrs);
    };

    let body = &code[start + 1..end - 1];
    for segment in body.split(',') {
        if segment.len() >= 3 && segment.as_bytes()[..3].eq_ignore_ascii_case(b"CQ:") {
            tag = segment[3..].to_string();
        } else if let Some(eq) = segment.find('=') {
            attrs.insert(segment[..eq].to_string(), segment[eq + 1..].to_string());
        }
    }

    if tag.eq_ignore_ascii_case("json")
        && let Some(data) = attrs.remove("data")
    {
        attrs.insert("data".to_string(), unescape_json_data(&data));
    }

    (tag, attrs)
}

/// Escapes a `json` tag's `data` value.
///
/// Ampersand goes first so the escapes it introduces are never re-escaped.
fn escape_json_data(data: &str) -> String {
    data.replace('&', "&amp;")
        .replace(',', "&#44;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Inverse of [`escape_json_data`]; ampersand goes last.
fn unescape_json_data(data: &str) -> String {
    data.replace("&#44;", ",")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}

// ============================================================================
// Convenience constructors
// ============================================================================
//
// These mirror the send-side tag vocabulary. Optional attributes that are
// empty or zero are omitted entirely rather than emitted as empty strings.

/// A QQ face/emoji.
pub fn face(id: i64) -> String {
    encode("face", &[("id", id.to_string())])
}

/// A voice record. `file` and `url` are optional; `magic` emits `magic=1`.
pub fn record(file: &str, url: &str, magic: bool) -> String {
    let mut attrs = Vec::new();

    if !file.is_empty() {
        attrs.push(("file", file.to_string()));
    }
    if !url.is_empty() {
        attrs.push(("url", url.to_string()));
    }
    if magic {
        attrs.push(("magic", "1".to_string()));
    }

    encode("record", &attrs)
}

/// A short video with an optional cover image.
pub fn video(file: &str, cover: &str) -> String {
    let mut attrs = vec![("file", file.to_string())];

    if !cover.is_empty() {
        attrs.push(("cover", cover.to_string()));
    }

    encode("video", &attrs)
}

/// An @mention with an optional display name.
pub fn at(user_id: i64, name: &str) -> String {
    let mut attrs = vec![("qq", user_id.to_string())];

    if !name.is_empty() {
        attrs.push(("name", name.to_string()));
    }

    encode("at", &attrs)
}

/// The rock-paper-scissors magic emoji.
pub fn rps() -> String {
    "[CQ:rps]".to_string()
}

/// A link share card.
pub fn link_share(url: &str, title: &str, content: &str, image: &str) -> String {
    let mut attrs = vec![("url", url.to_string()), ("title", title.to_string())];

    if !content.is_empty() {
        attrs.push(("content", content.to_string()));
    }
    if !image.is_empty() {
        attrs.push(("image", image.to_string()));
    }

    encode("share", &attrs)
}

/// A music share from a platform (`qq`, `163`, `xm`).
pub fn music_share(platform: &str, id: i64) -> String {
    encode(
        "music",
        &[("type", platform.to_string()), ("id", id.to_string())],
    )
}

/// A custom music share.
pub fn music_share_custom(url: &str, audio: &str, title: &str, content: &str, image: &str) -> String {
    let mut attrs = vec![
        ("type", "custom".to_string()),
        ("url", url.to_string()),
        ("audio", audio.to_string()),
        ("title", title.to_string()),
    ];

    if !content.is_empty() {
        attrs.push(("content", content.to_string()));
    }
    if !image.is_empty() {
        attrs.push(("image", image.to_string()));
    }

    encode("music", &attrs)
}

/// An image. `file` and `url` are optional; `flash` emits `type=flash`.
pub fn image(file: &str, url: &str, flash: bool) -> String {
    let mut attrs = Vec::new();

    if !file.is_empty() {
        attrs.push(("file", file.to_string()));
    }
    if !url.is_empty() {
        attrs.push(("url", url.to_string()));
    }
    if flash {
        attrs.push(("type", "flash".to_string()));
    }

    encode("image", &attrs)
}

/// A show-image effect. `id` outside 40000..=40005 falls back to 40000.
pub fn show_image(file: &str, url: &str, id: i64) -> String {
    let mut attrs = Vec::new();

    if !file.is_empty() {
        attrs.push(("file", file.to_string()));
    }
    if !url.is_empty() {
        attrs.push(("url", url.to_string()));
    }

    let id = if (40000..=40005).contains(&id) { id } else { 40000 };
    attrs.push(("id", id.to_string()));

    encode("image", &attrs)
}

/// A reply referencing a message by id.
pub fn reply(message_id: i64) -> String {
    encode("reply", &[("id", message_id.to_string())])
}

/// A custom reply with fabricated text, sender, sequence and timestamp.
pub fn reply_custom(text: &str, user_id: i64, seq: i64, time: i64) -> String {
    encode(
        "reply",
        &[
            ("text", text.to_string()),
            ("qq", user_id.to_string()),
            ("seq", seq.to_string()),
            ("time", time.to_string()),
        ],
    )
}

/// A poke aimed at a user.
pub fn poke(user_id: i64) -> String {
    encode("poke", &[("qq", user_id.to_string())])
}

/// An XML message.
pub fn xml(code: &str) -> String {
    encode("xml", &[("data", code.to_string())])
}

/// A JSON message; the payload is escaped so it survives the CQ syntax.
pub fn json(data: &str) -> String {
    encode("json", &[("data", escape_json_data(data))])
}

/// A card image with optional source, icon and size constraints.
pub fn card_image(
    file: &str,
    source: &str,
    icon: &str,
    minwidth: i64,
    minheight: i64,
    maxwidth: i64,
    maxheight: i64,
) -> String {
    let mut attrs = vec![("file", file.to_string())];

    if !source.is_empty() {
        attrs.push(("source", source.to_string()));
    }
    if !icon.is_empty() {
        attrs.push(("icon", icon.to_string()));
    }
    if minwidth != 0 {
        attrs.push(("minwidth", minwidth.to_string()));
    }
    if minheight != 0 {
        attrs.push(("minheight", minheight.to_string()));
    }
    if maxwidth != 0 {
        attrs.push(("maxwidth", maxwidth.to_string()));
    }
    if maxheight != 0 {
        attrs.push(("maxheight", maxheight.to_string()));
    }

    encode("cardimage", &attrs)
}

/// Text-to-speech.
pub fn tts(text: &str) -> String {
    encode("tts", &[("text", text.to_string())])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_preserves_attribute_order() {
        let code = encode(
            "share",
            &[("url", "http://a".into()), ("title", "b".into())],
        );
        assert_eq!(code, "[CQ:share,url=http://a,title=b]");
    }

    #[test]
    fn encode_decode_round_trip() {
        let code = encode(
            "image",
            &[("file", "1.jpg".into()), ("url", "http://x/1.jpg".into())],
        );
        let (tag, attrs) = decode(&code);
        assert_eq!(tag, "image");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["file"], "1.jpg");
        assert_eq!(attrs["url"], "http://x/1.jpg");
    }

    #[test]
    fn decode_splits_on_first_equals() {
        let (tag, attrs) = decode("[CQ:share,url=http://x?a=1&b=2]");
        assert_eq!(tag, "share");
        assert_eq!(attrs["url"], "http://x?a=1&b=2");
    }

    #[test]
    fn decode_is_case_insensitive_on_keyword() {
        let (tag, attrs) = decode("[cq:at,qq=10001000]");
        assert_eq!(tag, "at");
        assert_eq!(attrs["qq"], "10001000");
    }

    #[test]
    fn decode_without_span_yields_empty() {
        let (tag, attrs) = decode("just plain text");
        assert!(tag.is_empty());
        assert!(attrs.is_empty());
    }

    #[test]
    fn check_is_true_iff_find_is_non_empty() {
        for text in [
            "no tags here",
            "[CQ:face,id=1]",
            "prefix [CQ:at,qq=2] suffix",
            "[CQ:]",
            "half open [CQ:x",
        ] {
            assert_eq!(check(text), !find(text).is_empty(), "text: {text}");
        }
    }

    // Searching is greedy to the last close bracket: two tags on one line
    // match as a single span. Compatibility behavior, do not tighten.
    #[test]
    fn greedy_span_covers_two_tags() {
        let text = "[CQ:at,qq=1] and [CQ:face,id=2]";
        let spans = find(text);
        assert_eq!(spans, vec!["[CQ:at,qq=1] and [CQ:face,id=2]"]);
        assert_eq!(replace(text, ""), "");
    }

    #[test]
    fn replace_keeps_surrounding_text() {
        assert_eq!(replace("a [CQ:face,id=1] b", "*"), "a * b");
        assert_eq!(replace("no tag", "*"), "no tag");
    }

    #[test]
    fn json_escaping_is_a_true_inverse() {
        for payload in [
            r#"{"a":[1,2,3]}"#,
            "plain",
            ",&[]",
            "&amp;",
            "&#44;",
            "a,b&c[d]e",
            "&&&,,,[[]]",
        ] {
            let code = json(payload);
            let (tag, attrs) = decode(&code);
            assert_eq!(tag, "json");
            assert_eq!(attrs["data"], payload, "payload: {payload}");
        }
    }

    #[test]
    fn optional_attributes_are_omitted() {
        assert_eq!(record("", "", false), "[CQ:record]");
        assert_eq!(record("a.amr", "", true), "[CQ:record,file=a.amr,magic=1]");
        assert_eq!(at(42, ""), "[CQ:at,qq=42]");
        assert_eq!(at(42, "bob"), "[CQ:at,qq=42,name=bob]");
        assert_eq!(image("1.jpg", "", false), "[CQ:image,file=1.jpg]");
        assert_eq!(image("1.jpg", "", true), "[CQ:image,file=1.jpg,type=flash]");
    }

    #[test]
    fn show_image_clamps_effect_id() {
        assert_eq!(show_image("1.jpg", "", 40003), "[CQ:image,file=1.jpg,id=40003]");
        assert_eq!(show_image("1.jpg", "", 7), "[CQ:image,file=1.jpg,id=40000]");
    }

    #[test]
    fn url_helpers() {
        assert_eq!(file_url("tmp/a.jpg"), "file:///tmp/a.jpg");
        assert_eq!(base64_image("AAAA"), "base64://AAAA");
    }
}
