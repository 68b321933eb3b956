use std_util::str;

/// A schema identifier split into lower-case words.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Name {
    pub parts: Vec<String>,
}

impl Name {
    pub fn new(src: &str) -> Self {
        let snake = str::snake_case(src);
        let parts = snake.split('_').map(String::from).collect();
        Self { parts }
    }

    pub fn camel_case(&self) -> String {
        str::camel_case(&self.snake_case())
    }

    pub fn upper_camel_case(&self) -> String {
        str::upper_camel_case(&self.snake_case())
    }

    pub fn snake_case(&self) -> String {
        self.parts.join("_")
    }

    /// Human readable label, e.g. `Collection Object`.
    pub fn title_case(&self) -> String {
        str::title_case(&self.snake_case())
    }

    /// The spelling used on the wire, e.g. `collectionobject`.
    pub fn wire_case(&self) -> String {
        self.parts.concat()
    }
}
