use std::borrow::Cow;

use crate::error::Error;

/// Resolve the predefined entities and character references in text or an
/// attribute value. Content without `&` is returned as is.
pub(crate) fn parse_entities(content: Cow<'_, str>) -> Result<Cow<'_, str>, Error> {
    if !content.contains('&') {
        return Ok(content);
    }
    let mut result = String::with_capacity(content.len());
    let mut rest: &str = &content;
    while let Some(start) = rest.find('&') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| Error::UnclosedEntity(after.to_string()))?;
        let entity = &after[..end];
        result.push(resolve_entity(entity)?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Ok(result.into())
}

fn resolve_entity(entity: &str) -> Result<char, Error> {
    let c = match entity {
        "amp" => '&',
        "apos" => '\'',
        "gt" => '>',
        "lt" => '<',
        "quot" => '"',
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(decimal) = entity.strip_prefix('#') {
                decimal.parse::<u32>().ok()
            } else {
                None
            };
            return code
                .and_then(char::from_u32)
                .ok_or_else(|| Error::InvalidEntity(entity.to_string()));
        }
    };
    Ok(c)
}

/// Escape text content. `>` is only escaped when asked to, or when it
/// would complete `]]>`.
pub(crate) fn serialize_text(content: &str, unescaped_gt: bool) -> Cow<'_, str> {
    if !content.contains(|c| matches!(c, '&' | '<' | '>')) {
        return content.into();
    }
    let mut result = String::with_capacity(content.len() + 8);
    for (i, c) in content.char_indices() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' if unescaped_gt && !content[..i].ends_with("]]") => result.push('>'),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result.into()
}

/// Escape an attribute value for use between double quotes. Whitespace
/// other than the space character is written as a character reference so
/// attribute value normalization doesn't eat it.
pub(crate) fn serialize_attribute(content: &str) -> Cow<'_, str> {
    if !content.contains(|c| matches!(c, '&' | '<' | '>' | '"' | '\t' | '\n' | '\r')) {
        return content.into();
    }
    let mut result = String::with_capacity(content.len() + 8);
    for c in content.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\t' => result.push_str("&#9;"),
            '\n' => result.push_str("&#10;"),
            '\r' => result.push_str("&#13;"),
            _ => result.push(c),
        }
    }
    result.into()
}

/// Wrap content in CDATA sections. `]]>` can't appear inside one, so the
/// content is split between two sections there.
pub(crate) fn serialize_cdata(content: &str) -> String {
    format!("<![CDATA[{}]]>", content.replace("]]>", "]]]]><![CDATA[>"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(parse_entities("A &amp; B".into()).unwrap(), "A & B");
    }

    #[test]
    fn test_parse_multiple() {
        assert_eq!(
            parse_entities("&amp;&apos;&gt;&lt;&quot;".into()).unwrap(),
            "&'><\""
        );
    }

    #[test]
    fn test_parse_char_refs() {
        assert_eq!(
            parse_entities("a&#10;b&#x41;".into()).unwrap(),
            "a\nbA"
        );
    }

    #[test]
    fn test_parse_unknown_entity() {
        let err = parse_entities("&unknown;".into());
        if let Err(Error::InvalidEntity(entity)) = err {
            assert_eq!(entity, "unknown");
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_parse_bad_char_ref() {
        assert!(matches!(
            parse_entities("&#xD800;".into()),
            Err(Error::InvalidEntity(_))
        ));
    }

    #[test]
    fn test_parse_unfinished_entity() {
        let err = parse_entities("&amp".into());
        if let Err(Error::UnclosedEntity(entity)) = err {
            assert_eq!(entity, "amp");
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_parse_no_entities() {
        let text = "hello";
        let result = parse_entities(text.into()).unwrap();
        // this is the same slice
        assert!(std::ptr::eq(text, result.as_ref()));
    }

    #[test]
    fn test_serialize_text() {
        assert_eq!(serialize_text("a < b & c > d", false), "a &lt; b &amp; c &gt; d");
    }

    #[test]
    fn test_serialize_text_unescaped_gt() {
        assert_eq!(serialize_text("a > b ]]> c", true), "a > b ]]&gt; c");
    }

    #[test]
    fn test_serialize_attribute() {
        assert_eq!(
            serialize_attribute("\"a\"\tb\n<"),
            "&quot;a&quot;&#9;b&#10;&lt;"
        );
    }

    #[test]
    fn test_serialize_no_escapes() {
        let text = "hello";
        assert!(std::ptr::eq(text, serialize_text(text, false).as_ref()));
        assert!(std::ptr::eq(text, serialize_attribute(text).as_ref()));
    }

    #[test]
    fn test_serialize_cdata_split() {
        assert_eq!(
            serialize_cdata("a]]>b"),
            "<![CDATA[a]]]]><![CDATA[>b]]>"
        );
    }
}
