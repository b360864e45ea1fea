use time::{format_description::BorrowedFormatItem, macros::format_description};

/// Textual layout of dates, shared by literal rendering and decoding.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
/// Textual layout of times, fixed microsecond precision so text ordering matches time ordering.
pub const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:6]");
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
);

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

#[macro_export]
macro_rules! possibly_parenthesized {
    ($buff:ident, $cond:expr, $v:expr) => {
        if $cond {
            $buff.push('(');
            $v;
            $buff.push(')');
        } else {
            $v;
        }
    };
}

/// Cut long text (usually SQL) for log lines, respecting char boundaries.
pub fn truncate_long(value: &str) -> String {
    let mut end = value.len().min(497);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}{}",
        value[..end].trim_end(),
        if value.len() > end { "..." } else { "" }
    )
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        $crate::truncate_long(::std::convert::AsRef::<str>::as_ref(&$query))
    };
}
