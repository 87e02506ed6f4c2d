//! Text helpers shared by the client, fetcher and bibliography writer.
//!
//! # Examples
//!
//! ```
//! use curator::format;
//!
//! assert_eq!(format::sanitize_identifier("math.AG/0601001"), "math.AG_0601001");
//! assert_eq!(format::collapse_whitespace("  A\n   Title  "), "A Title");
//! assert_eq!(format::preview("A Very Long Document Title", 12), "A Very Long...");
//! ```

/// Makes an arXiv identifier safe to use as a file name.
///
/// Old-style identifiers such as `hep-th/9901001` contain a path separator; every `/` and `\`
/// is replaced with an underscore so the name stays a single path component.
pub fn sanitize_identifier(id: &str) -> String { id.replace(['/', '\\'], "_") }

/// Trims the text and collapses every run of whitespace (including newlines) into one space.
///
/// arXiv wraps titles and abstracts over several lines in its feed.
pub fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Shortens text for console display, cutting at a word boundary and appending `...`.
///
/// Text no longer than `max_length` characters is returned unchanged. A first word that is
/// already too long is cut mid-word.
pub fn preview(text: &str, max_length: usize) -> String {
  if text.chars().count() <= max_length {
    return text.to_string();
  }

  let mut result = String::new();
  for word in text.split_whitespace() {
    let separator = usize::from(!result.is_empty());
    if result.chars().count() + separator + word.chars().count() > max_length {
      break;
    }
    if separator == 1 {
      result.push(' ');
    }
    result.push_str(word);
  }

  if result.is_empty() {
    result = text.chars().take(max_length).collect();
  }
  format!("{result}...")
}

/// Escapes the characters BibTeX treats as group delimiters.
pub fn escape_bibtex(text: &str) -> String { text.replace('{', "\\{").replace('}', "\\}") }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sanitize_identifier() {
    assert_eq!(sanitize_identifier("2401.00001"), "2401.00001");
    assert_eq!(sanitize_identifier("hep-th/9901001"), "hep-th_9901001");
    assert_eq!(sanitize_identifier("a\\b/c"), "a_b_c");
  }

  #[test]
  fn test_collapse_whitespace() {
    assert_eq!(collapse_whitespace("Quadratic\n  Voting in\tDAOs "), "Quadratic Voting in DAOs");
    assert_eq!(collapse_whitespace(""), "");
  }

  #[test]
  fn test_preview() {
    assert_eq!(preview("short", 80), "short");
    assert_eq!(preview("This Is A Very Long Title Indeed", 20), "This Is A Very Long...");
    assert_eq!(preview("Supercalifragilistic", 5), "Super...");
  }

  #[test]
  fn test_escape_bibtex() {
    assert_eq!(escape_bibtex("The {DAO} Problem"), "The \\{DAO\\} Problem");
  }
}
