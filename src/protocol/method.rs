use std::fmt;

/// Request methods the counter understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
  /// Read the current count
  Get,
  /// Increment the count and read the new value
  Put,
  /// Anything else, rejected by the handler
  Unsupported(String),
}

impl Method {
  /// Classify a method token. Matching is exact, `get` is not `GET`.
  pub fn parse(token: &str) -> Self {
    match token {
      "GET" => Method::Get,
      "PUT" => Method::Put,
      other => Method::Unsupported(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Method::Get => "GET",
      Method::Put => "PUT",
      Method::Unsupported(token) => token,
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_known_methods() {
    assert_eq!(Method::parse("GET"), Method::Get);
    assert_eq!(Method::parse("PUT"), Method::Put);
  }

  #[test]
  fn test_parse_is_case_sensitive() {
    assert_eq!(Method::parse("get"), Method::Unsupported("get".to_string()));
    assert_eq!(Method::parse("Put"), Method::Unsupported("Put".to_string()));
  }

  #[test]
  fn test_parse_unsupported() {
    for token in ["POST", "DELETE", "PATCH", ""] {
      let method = Method::parse(token);
      assert_eq!(method, Method::Unsupported(token.to_string()));
      assert_eq!(method.as_str(), token);
    }
  }
}
