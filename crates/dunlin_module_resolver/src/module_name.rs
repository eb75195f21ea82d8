use std::fmt;
use std::ops::Deref;

use compact_str::{CompactString, ToCompactString};

use dunlin_python_ast::identifiers::is_identifier;

/// A module name, e.g. `foo.bar`.
///
/// Always normalized to the absolute form (never a relative module name,
/// i.e., never `.foo`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModuleName(CompactString);

impl ModuleName {
    /// Creates a new module name for `name`. Returns `Some` if `name` is a
    /// valid, absolute module name and `None` otherwise.
    ///
    /// The module name is invalid if:
    ///
    /// * The name is empty
    /// * The name is relative
    /// * The name ends with a `.`
    /// * The name contains a sequence of multiple dots
    /// * A component of a name (the part between two dots) isn't a valid
    ///   python identifier.
    #[inline]
    #[must_use]
    pub fn new(name: &str) -> Option<Self> {
        Self::is_valid_name(name).then(|| Self(CompactString::from(name)))
    }

    /// Creates a new module name for a static string.
    ///
    /// ## Examples
    ///
    /// ```
    /// use dunlin_module_resolver::ModuleName;
    ///
    /// assert_eq!(ModuleName::new_static("foo.bar").as_deref(), Some("foo.bar"));
    /// assert_eq!(ModuleName::new_static(""), None);
    /// assert_eq!(ModuleName::new_static(".foo"), None);
    /// assert_eq!(ModuleName::new_static("foo."), None);
    /// assert_eq!(ModuleName::new_static("foo..bar"), None);
    /// assert_eq!(ModuleName::new_static("2000"), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn new_static(name: &'static str) -> Option<Self> {
        Self::is_valid_name(name).then(|| Self(CompactString::const_new(name)))
    }

    #[must_use]
    fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && name.split('.').all(is_identifier)
    }

    /// An iterator over the components of the module name:
    ///
    /// ```
    /// use dunlin_module_resolver::ModuleName;
    ///
    /// assert_eq!(
    ///     ModuleName::new_static("foo.bar.baz").unwrap().components().collect::<Vec<_>>(),
    ///     vec!["foo", "bar", "baz"],
    /// );
    /// ```
    #[must_use]
    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('.')
    }

    /// The name of this module's immediate parent, if it has a parent.
    #[must_use]
    pub fn parent(&self) -> Option<ModuleName> {
        let (parent, _) = self.0.rsplit_once('.')?;
        Some(Self(parent.to_compact_string()))
    }

    /// Returns `true` if `self` is a sub-module of `other`.
    #[must_use]
    pub fn starts_with(&self, other: &ModuleName) -> bool {
        let mut self_components = self.components();
        let other_components = other.components();

        for other_component in other_components {
            if self_components.next() != Some(other_component) {
                return false;
            }
        }

        true
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Construct a [`ModuleName`] from a sequence of parts.
    ///
    /// ```
    /// use dunlin_module_resolver::ModuleName;
    ///
    /// assert_eq!(&*ModuleName::from_components(["a", "b", "c"]).unwrap(), "a.b.c");
    /// assert_eq!(ModuleName::from_components(["a-b"]), None);
    /// ```
    #[must_use]
    pub fn from_components<'a>(components: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut name = CompactString::default();
        for (index, part) in components.into_iter().enumerate() {
            if !is_identifier(part) {
                return None;
            }
            if index > 0 {
                name.push('.');
            }
            name.push_str(part);
        }
        (!name.is_empty()).then_some(Self(name))
    }

    /// Extend `self` with the components of `other`.
    pub fn extend(&mut self, other: &ModuleName) {
        self.0.push('.');
        self.0.push_str(other);
    }

    /// Append a single component.
    pub fn push(&mut self, component: &str) {
        if !self.0.is_empty() {
            self.0.push('.');
        }
        self.0.push_str(component);
    }

    /// Returns an iterator of this module name and all of its parent modules,
    /// longest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self.clone()), Self::parent)
    }
}

impl Deref for ModuleName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl PartialEq<str> for ModuleName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<ModuleName> for str {
    fn eq(&self, other: &ModuleName) -> bool {
        self == other.as_str()
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleName;

    #[test]
    fn valid_and_invalid_names() {
        assert_eq!(ModuleName::new("foo.bar").as_deref(), Some("foo.bar"));
        assert!(ModuleName::new("foo").is_some());
        assert_eq!(ModuleName::new("..foo"), None);
        assert_eq!(ModuleName::new("foo-bar"), None);
        assert_eq!(ModuleName::new("foo.2000"), None);
    }

    #[test]
    fn ancestors() {
        let name = ModuleName::new_static("foo.bar.baz").unwrap();
        let ancestors: Vec<_> = name.ancestors().collect();
        assert_eq!(
            ancestors,
            vec![
                ModuleName::new_static("foo.bar.baz").unwrap(),
                ModuleName::new_static("foo.bar").unwrap(),
                ModuleName::new_static("foo").unwrap(),
            ],
        );
    }

    #[test]
    fn push_and_extend() {
        let mut name = ModuleName::new_static("foo").unwrap();
        name.push("bar");
        assert_eq!(&name, "foo.bar");
        name.extend(&ModuleName::new_static("baz.eggs").unwrap());
        assert_eq!(&name, "foo.bar.baz.eggs");
    }

    #[test]
    fn starts_with() {
        let foo_bar = ModuleName::new_static("foo.bar").unwrap();
        assert!(foo_bar.starts_with(&ModuleName::new_static("foo").unwrap()));
        assert!(!foo_bar.starts_with(&ModuleName::new_static("bar").unwrap()));
        assert!(!ModuleName::new_static("foo_bar")
            .unwrap()
            .starts_with(&ModuleName::new_static("foo").unwrap()));
    }
}
