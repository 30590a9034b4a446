/// One parsed row: an ordered sequence of field strings.
///
/// Records are immutable once the parser hands them out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every field is empty (a blank line or a line of bare separators)
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.is_empty())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.fields.iter()
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

impl From<Vec<String>> for Record {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl<'a> From<&[&'a str]> for Record {
    fn from(fields: &[&'a str]) -> Self {
        Self::new(fields.iter().map(|f| f.to_string()).collect())
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
