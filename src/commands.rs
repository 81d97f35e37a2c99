/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "home"],
    description: "Stock and sales overview",
  },
  Command {
    name: "products",
    aliases: &["p", "catalog"],
    description: "Product catalog",
  },
  Command {
    name: "inventory",
    aliases: &["i", "inv", "stock"],
    description: "Edit and delete products",
  },
  Command {
    name: "transactions",
    aliases: &["t", "tx", "sales"],
    description: "Sales and returns",
  },
  Command {
    name: "logout",
    aliases: &[],
    description: "End the admin session",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit i9s",
  },
];

/// Look up a command by exact name or alias
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // Stable, so ties keep declaration order
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; None means no match
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("inventory");
    assert_eq!(suggestions[0].name, "inventory");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("i")[0].name, "inventory");
    assert_eq!(get_suggestions("tx")[0].name, "transactions");
    assert_eq!(get_suggestions("home")[0].name, "dashboard");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("prod");
    assert_eq!(suggestions[0].name, "products");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("sact");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "transactions");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }

  #[test]
  fn test_find_by_alias() {
    assert_eq!(find("stock").map(|c| c.name), Some("inventory"));
    assert_eq!(find(" Q ").map(|c| c.name), Some("quit"));
    assert!(find("pro").is_none());
  }
}
