/// Ordered PGN tag pairs. Insertion order is export order; setting an
/// existing tag replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnHeaders {
    tags: Vec<(String, String)>,
}

impl PgnHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.tags.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut headers = PgnHeaders::new();
        headers.set("Event", "Game");
        headers.set("Result", "*");
        headers.set("Event", "Time 5+3");

        let tags: Vec<_> = headers.iter().collect();
        assert_eq!(tags, vec![("Event", "Time 5+3"), ("Result", "*")]);
        assert_eq!(headers.get("Missing"), None);
    }
}
