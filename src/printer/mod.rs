//! Printers for evaluation results.

use owo_colors::OwoColorize;
use serde_json::Value;

pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        if let Some(c) = self.color {
            match c {
                "green" => println!("{}", text.green()),
                "cyan" => println!("{}", text.cyan()),
                "magenta" => println!("{}", text.magenta()),
                "yellow" => println!("{}", text.yellow()),
                "red" => println!("{}", text.red()),
                _ => println!("{}", text),
            }
        } else {
            println!("{}", text);
        }
    }
}

/// Strings are printed as-is, everything else as pretty JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub struct ValuePrinter {
    pub colored: bool,
}

impl ValuePrinter {
    pub fn print(&self, value: &Value) {
        let text = render_value(value);
        let color = match value {
            _ if !self.colored => None,
            Value::String(_) => None,
            Value::Array(_) | Value::Object(_) => Some("cyan"),
            _ => Some("green"),
        };
        TextPrinter { color }.print(&text);
    }

    pub fn print_list(&self, items: &[String]) {
        for (i, item) in items.iter().enumerate() {
            if self.colored {
                println!("{} {}", format!("{:>4}", i + 1).dimmed(), item);
            } else {
                println!("{}", item);
            }
        }
    }

    pub fn print_error(&self, message: &str) {
        if self.colored {
            eprintln!("{}", message.red());
        } else {
            eprintln!("{}", message);
        }
    }
}
