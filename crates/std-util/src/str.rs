use heck::{ToLowerCamelCase, ToSnakeCase, ToTitleCase, ToUpperCamelCase};

pub fn snake_case(src: &str) -> String {
    src.to_snake_case()
}

pub fn camel_case(src: &str) -> String {
    src.to_lower_camel_case()
}

pub fn upper_camel_case(src: &str) -> String {
    src.to_upper_camel_case()
}

pub fn title_case(src: &str) -> String {
    src.to_title_case()
}
