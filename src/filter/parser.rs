use super::types::FilterMap;

/// Build a FilterMap from raw `filter` query values shaped `[attribute]value`.
///
/// Values that do not have that shape are skipped. Later occurrences of an
/// attribute overwrite earlier ones.
pub fn parse_filters<I, S>(raw: I) -> FilterMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut filters = FilterMap::new();

    for item in raw {
        let item = item.as_ref();
        match split_filter(item) {
            Some((attribute, value)) => filters.insert(attribute, value),
            None => tracing::debug!("Ignoring malformed filter: {:?}", item),
        }
    }

    filters
}

/// The attribute starts after the first `[` and runs to the last `]` that
/// still leaves a non-empty value. Text before the `[` is ignored.
fn split_filter(raw: &str) -> Option<(&str, &str)> {
    let open = raw.find('[')?;
    let rest = &raw[open + 1..];
    let (last, _) = rest.char_indices().last()?;
    let close = rest[..last].rfind(']')?;

    let attribute = &rest[..close];
    let value = &rest[close + 1..];
    if attribute.is_empty() || value.is_empty() {
        return None;
    }
    Some((attribute, value))
}
