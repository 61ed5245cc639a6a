use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key did to a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Edited,
    Ignored,
}

/// Single-line text input. Editing happens at the end of the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
    masked: bool,
}

impl TextField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            masked: false,
        }
    }

    /// A field whose contents render as bullets.
    pub fn secret() -> Self {
        Self {
            value: String::new(),
            masked: true,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    /// Trimmed value, `None` when blank.
    pub fn optional(&self) -> Option<String> {
        let value = self.value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn paste(&mut self, text: &str) {
        self.value.extend(text.chars().filter(|c| !c.is_control()));
    }

    pub fn display(&self) -> String {
        if self.masked {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FieldKey {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Backspace => {
                self.value.pop();
                FieldKey::Edited
            }
            KeyCode::Char('u') if ctrl => {
                self.value.clear();
                FieldKey::Edited
            }
            KeyCode::Char(c) if !ctrl => {
                self.value.push(c);
                FieldKey::Edited
            }
            _ => FieldKey::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut field = TextField::default();
        field.handle_key(key(KeyCode::Char('т')));
        field.handle_key(key(KeyCode::Char('у')));
        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value(), "т");
    }

    #[test]
    fn test_secret_is_masked() {
        let mut field = TextField::secret();
        field.paste("secret");
        assert_eq!(field.display(), "••••••");
        assert_eq!(field.value(), "secret");
    }

    #[test]
    fn test_ctrl_u_clears() {
        let mut field = TextField::new("abc");
        field.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(field.is_empty());
        assert_eq!(field.optional(), None);
    }
}
