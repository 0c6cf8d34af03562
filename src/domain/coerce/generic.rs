//! Nested generic kind expressions such as `Array(Optional(UInt8))` or
//! `vector<u64>`

/// Container shapes a chain may expose in its kind expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Array,
    Optional,
}

/// A `Container(Inner)` / `Container<Inner>` kind split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericKind<'a> {
    pub container: &'a str,
    pub inner: &'a str,
}

/// Split a kind expression of the form `Name(Inner)` or `Name<Inner>`.
///
/// The closing delimiter must end the expression and match the opening one
/// at depth zero, so `A(B)(C)` is rejected.
pub fn split_generic(kind: &str) -> Option<GenericKind<'_>> {
    let kind = kind.trim();
    let open = kind.find(['(', '<'])?;
    let (opener, closer) = match kind.as_bytes()[open] {
        b'(' => (b'(', b')'),
        _ => (b'<', b'>'),
    };
    if kind.as_bytes().last() != Some(&closer) {
        return None;
    }

    let container = kind[..open].trim();
    if container.is_empty() {
        return None;
    }

    let mut depth = 0usize;
    for (idx, byte) in kind.bytes().enumerate().skip(open) {
        if byte == opener {
            depth += 1;
        } else if byte == closer {
            depth = depth.checked_sub(1)?;
            if depth == 0 && idx != kind.len() - 1 {
                return None;
            }
        }
    }
    if depth != 0 {
        return None;
    }

    let inner = kind[open + 1..kind.len() - 1].trim();
    if inner.is_empty() {
        return None;
    }
    Some(GenericKind { container, inner })
}

/// Split the elements of a bracketed list (`[a, "b,c", [d, e]]`) at top-level
/// commas, stripping one level of surrounding quotes from each element.
pub fn split_list(source: &str) -> Option<Vec<String>> {
    let source = source.trim();
    let body = source.strip_prefix('[')?.strip_suffix(']')?;
    if body.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in body.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '[' | '(' | '{' => {
                depth += 1;
                current.push(c);
            }
            ']' | ')' | '}' => {
                depth = depth.checked_sub(1)?;
                current.push(c);
            }
            ',' if depth == 0 => {
                items.push(unquote(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if quote.is_some() || depth != 0 {
        return None;
    }
    items.push(unquote(&current));
    Some(items)
}

fn unquote(item: &str) -> String {
    let item = item.trim();
    let quoted = item.len() >= 2
        && ((item.starts_with('"') && item.ends_with('"'))
            || (item.starts_with('\'') && item.ends_with('\'')));
    if quoted {
        item[1..item.len() - 1].to_string()
    } else {
        item.to_string()
    }
}
