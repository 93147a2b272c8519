// Output sink handed to every component that talks to the user. The menu
// owns one `Console` and clones it into commands at construction, so tests
// can swap stdout for an in-memory buffer.

use crossterm::style::Stylize;
use serde_json::Value;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

#[derive(Clone)]
pub struct Console {
    out: Rc<RefCell<Box<dyn Write>>>,
    styled: bool,
}

/// Handle on the buffer behind [`Console::capture`].
#[derive(Clone, Default)]
pub struct Captured(Rc<RefCell<Vec<u8>>>);

impl Captured {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Console {
    pub fn stdout() -> Self {
        Console {
            out: Rc::new(RefCell::new(Box::new(io::stdout()))),
            styled: true,
        }
    }

    /// Unstyled console writing into memory.
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        let console = Console {
            out: Rc::new(RefCell::new(Box::new(captured.clone()))),
            styled: false,
        };
        (console, captured)
    }

    fn write_line(&self, text: impl std::fmt::Display) {
        // Nothing useful to do if the terminal went away.
        let _ = writeln!(self.out.borrow_mut(), "{}", text);
    }

    pub fn line(&self, text: &str) {
        self.write_line(text);
    }

    /// Boxed heading, used before a block of output.
    pub fn title(&self, text: &str) {
        let rule = "─".repeat(text.chars().count() + 2);
        if self.styled {
            self.write_line(format!("┌{}┐", rule).cyan());
            self.write_line(format!("│ {} │", text.bold()).cyan());
            self.write_line(format!("└{}┘", rule).cyan());
        } else {
            self.write_line(format!("┌{}┐\n│ {} │\n└{}┘", rule, text, rule));
        }
    }

    pub fn info(&self, text: &str) {
        if self.styled {
            self.write_line(text.cyan());
        } else {
            self.write_line(text);
        }
    }

    pub fn success(&self, text: &str) {
        if self.styled {
            self.write_line(text.bold().green());
        } else {
            self.write_line(text);
        }
    }

    pub fn warn(&self, text: &str) {
        if self.styled {
            self.write_line(text.yellow());
        } else {
            self.write_line(format!("warning: {}", text));
        }
    }

    pub fn error(&self, text: &str) {
        if self.styled {
            self.write_line(text.bold().red());
        } else {
            self.write_line(format!("error: {}", text));
        }
    }

    pub fn dim(&self, text: &str) {
        if self.styled {
            self.write_line(text.dim());
        } else {
            self.write_line(text);
        }
    }

    /// Title followed by the value pretty-printed. Strings print bare.
    pub fn json(&self, title: &str, value: &Value) {
        self.title(title);
        match value {
            Value::String(s) => self.write_line(s),
            other => match serde_json::to_string_pretty(other) {
                Ok(pretty) => self.write_line(pretty),
                Err(_) => self.write_line(other),
            },
        }
    }
}
