use itertools::Itertools;

/// Assembles multi-line notification texts.
#[derive(Debug, Default, Clone)]
pub struct MessageBuilder {
    lines: Vec<String>,
    list_index: usize,
}

impl MessageBuilder {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            lines: vec![headline.into()],
            list_index: 0,
        }
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.lines.push(text.into());
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(String::new());
        self.list_index = 0;
        self
    }

    /// `• key: value`
    pub fn field(self, key: &str, value: impl std::fmt::Display) -> Self {
        self.line(format!("• {}: {}", key, value))
    }

    /// `• text`
    pub fn bullet(self, text: impl std::fmt::Display) -> Self {
        self.line(format!("• {}", text))
    }

    /// Numbered item; numbering restarts after every [MessageBuilder::blank].
    pub fn item(mut self, text: impl std::fmt::Display) -> Self {
        self.list_index += 1;
        let line = format!("{}. {}", self.list_index, text);
        self.line(line)
    }

    pub fn build(self) -> String {
        self.lines.iter().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use assertor::*;

    use super::*;

    #[test]
    fn renders_sections_in_order() {
        // given
        let builder = MessageBuilder::new("Head")
            .blank()
            .field("Total time", "12 sec")
            .bullet("IP 192.0.2.7")
            .blank()
            .item("first")
            .item("second");

        // when
        let text = builder.build();

        // then
        assert_that!(text).is_equal_to(
            "Head\n\n• Total time: 12 sec\n• IP 192.0.2.7\n\n1. first\n2. second".to_string(),
        );
    }

    #[test]
    fn numbering_restarts_after_blank() {
        let text = MessageBuilder::new("x").item("a").blank().item("b").build();
        assert!(text.ends_with("\n\n1. b"));
    }
}
