use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuLink {
    pub name: String,
    pub href: String,
}

impl MenuLink {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            href: href.into(),
        }
    }
}

/// A sidebar section with its links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItem {
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub children: Vec<MenuLink>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            children: Vec::new(),
        }
    }

    pub fn with_link(mut self, name: impl Into<String>, href: impl Into<String>) -> Self {
        self.children.push(MenuLink::new(name, href));
        self
    }
}
