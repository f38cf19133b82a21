//! The fixed top-level content categories of a site.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the fixed top-level component folders of a project or module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Content,
    Layouts,
    Static,
    Data,
    Assets,
    I18n,
    Archetypes,
}

impl Component {
    /// All components, in their canonical order.
    pub const ALL: [Component; 7] = [
        Component::Content,
        Component::Layouts,
        Component::Static,
        Component::Data,
        Component::Assets,
        Component::I18n,
        Component::Archetypes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Content => "content",
            Component::Layouts => "layouts",
            Component::Static => "static",
            Component::Data => "data",
            Component::Assets => "assets",
            Component::I18n => "i18n",
            Component::Archetypes => "archetypes",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(Component::Content),
            "layouts" => Ok(Component::Layouts),
            "static" => Ok(Component::Static),
            "data" => Ok(Component::Data),
            "assets" => Ok(Component::Assets),
            "i18n" => Ok(Component::I18n),
            "archetypes" => Ok(Component::Archetypes),
            other => Err(format!("unknown component folder: {other:?}")),
        }
    }
}
