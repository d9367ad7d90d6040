//! Fixed category set and the follow-up questions attached to it.
//!
//! Categories are static configuration: their order drives storage column
//! order, export column order and the order in which missing follow-ups are
//! reported.

use serde::{Deserialize, Serialize};

/// Storage key of the distinguished "other" category.
pub const OTHER_KEY: &str = "inne";

/// Number of categories in [`CATEGORIES`].
pub const CATEGORY_COUNT: usize = 8;

/// A single-choice question shown while its governing category is active.
#[derive(Debug, PartialEq, Eq)]
pub struct Question {
    /// Prompt shown above the options.
    pub prompt: &'static str,
    /// Ordered options; the stored choice is an index into this list.
    pub options: &'static [&'static str],
}

/// Which follow-up a category asks for while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpKind {
    /// No follow-up.
    None,
    /// A topic-specific detail question stored in `<key>_detail`.
    Detail(&'static Question),
    /// The shared intent question stored in `intent`.
    Intent,
}

/// One labeling dimension.
#[derive(Debug, PartialEq, Eq)]
pub struct Category {
    /// Name shown on tiles and used as export header.
    pub name: &'static str,
    /// Column name in the store.
    pub key: &'static str,
    /// Follow-up owned by this category.
    pub follow_up: FollowUpKind,
}

impl Category {
    /// Detail question, if this category owns one.
    pub fn detail_question(&self) -> Option<&'static Question> {
        match self.follow_up {
            FollowUpKind::Detail(question) => Some(question),
            _ => None,
        }
    }

    /// True when this category owns a topic-specific detail question.
    pub fn has_detail(&self) -> bool {
        self.detail_question().is_some()
    }

    /// Question the annotator must answer while this category is active.
    pub fn question(&self) -> Option<&'static Question> {
        match self.follow_up {
            FollowUpKind::Detail(question) => Some(question),
            FollowUpKind::Intent => Some(&INTENT_QUESTION),
            FollowUpKind::None => None,
        }
    }
}

const NOT_APPLICABLE: &str = "Nie dotyczy / trudno powiedzieć";

const TRUST_OPTIONS: &[&str] = &[
    "nie ma zaufania",
    "ma zaufanie",
    "inni ludzie nie mają zaufania",
    "inni ludzie mają zaufanie",
    NOT_APPLICABLE,
];

static IMMIGRATION_QUESTION: Question = Question {
    prompt: "W odniesieniu do przyjmowania imigrantów, nadawca wskazuje że:",
    options: &[
        "jest przeciwny imigracji",
        "popiera imigrację",
        "inni ludzie sprzeciwiają się imigracji",
        "inni ludzie popierają imigrację",
        NOT_APPLICABLE,
    ],
};

static TRUST_QUESTION: Question = Question {
    prompt: "W odniesieniu do zaufania do nieznajomych, nadawca wskazuje że:",
    options: TRUST_OPTIONS,
};

static CLIMATE_QUESTION: Question = Question {
    prompt: "W odniesieniu do gotowości do zmiany stylu życia dla klimatu, nadawca wskazuje że:",
    options: &[
        "nie ma gotowości",
        "ma gotowość",
        "inni ludzie wyrażają brak gotowości",
        "inni ludzie wyrażają gotowość",
        NOT_APPLICABLE,
    ],
};

static HEALTH_QUESTION: Question = Question {
    prompt: "W odniesieniu do zdrowia fizycznego i samopoczucia, nadawca wskazuje, że:",
    options: &[
        "jego stan jest dobry",
        "jego stan jest zły",
        "stan innych ludzi jest dobry",
        "stan innych ludzi jest zły",
        NOT_APPLICABLE,
    ],
};

static AGENCY_QUESTION: Question = Question {
    prompt: "W odniesieniu do możliwości wpływania na politykę w Polsce, nadawca wskazuje że:",
    options: &[
        "ma możliwość wpływu",
        "nie ma możliwości wpływu",
        "inni ludzie mają możliwość wpływu",
        "inni ludzie nie mają możliwości wpływu",
        NOT_APPLICABLE,
    ],
};

static SCIENTISTS_QUESTION: Question = Question {
    prompt: "W odniesieniu do zaufania do nauki i naukowców, nadawca wskazuje że:",
    options: TRUST_OPTIONS,
};

static VACCINES_QUESTION: Question = Question {
    prompt: "W odniesieniu do zaufania wobec szczepień i szczepionek, nadawca wskazuje że:",
    options: TRUST_OPTIONS,
};

/// Shared question asked while the "other" category is active.
pub static INTENT_QUESTION: Question = Question {
    prompt: "Główna intencja wypowiedzi nadawcy to:",
    options: &[
        "Informowanie i dzielenie się treściami",
        "Poszukiwanie informacji i opinii",
        "Perswazja i mobilizacja",
        "Ocena i reakcje emocjonalne",
        "Autoprezentacja",
        "Rozrywka",
    ],
};

/// All categories in declaration order.
pub static CATEGORIES: [Category; CATEGORY_COUNT] = [
    Category {
        name: "IMIGRACJA",
        key: "imigracja",
        follow_up: FollowUpKind::Detail(&IMMIGRATION_QUESTION),
    },
    Category {
        name: "ZAUFANIE",
        key: "zaufanie",
        follow_up: FollowUpKind::Detail(&TRUST_QUESTION),
    },
    Category {
        name: "KLIMAT",
        key: "klimat",
        follow_up: FollowUpKind::Detail(&CLIMATE_QUESTION),
    },
    Category {
        name: "ZDROWIE",
        key: "zdrowie",
        follow_up: FollowUpKind::Detail(&HEALTH_QUESTION),
    },
    Category {
        name: "SPRAWCZOŚĆ",
        key: "sprawczosc",
        follow_up: FollowUpKind::Detail(&AGENCY_QUESTION),
    },
    Category {
        name: "NAUKOWCY",
        key: "naukowcy",
        follow_up: FollowUpKind::Detail(&SCIENTISTS_QUESTION),
    },
    Category {
        name: "SZCZEPIONKI",
        key: "szczepionki",
        follow_up: FollowUpKind::Detail(&VACCINES_QUESTION),
    },
    Category {
        name: "INNE",
        key: OTHER_KEY,
        follow_up: FollowUpKind::Intent,
    },
];

/// Look up a category by storage key.
pub fn category(key: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|category| category.key == key)
}

/// Position of a category in declaration order.
pub fn category_index(key: &str) -> Option<usize> {
    CATEGORIES.iter().position(|category| category.key == key)
}

/// Categories owning a detail question, in declaration order.
pub fn detail_categories() -> impl Iterator<Item = &'static Category> {
    CATEGORIES.iter().filter(|category| category.has_detail())
}

/// Stored answer to a follow-up question. `-1` in storage means unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Choice(Option<u16>);

impl Choice {
    /// No answer selected.
    pub const UNANSWERED: Self = Self(None);

    /// Choice selecting the option at `index`.
    pub fn option(index: usize) -> Self {
        Self(Some(index.min(u16::MAX as usize) as u16))
    }

    /// Selected option index, if any.
    pub fn index(self) -> Option<usize> {
        self.0.map(usize::from)
    }

    /// True once an option has been selected.
    pub fn is_answered(self) -> bool {
        self.0.is_some()
    }

    /// Convert to the integer stored in SQLite.
    pub fn as_i64(self) -> i64 {
        self.0.map(i64::from).unwrap_or(-1)
    }

    /// Parse a stored integer.
    ///
    /// Negative values and values above `u16::MAX` read as unanswered. No
    /// question has that many options, so such values only come from
    /// hand-edited stores; they are exported as `-1` like any other
    /// unanswered choice.
    pub fn from_i64(value: i64) -> Self {
        u16::try_from(value).map(|v| Self(Some(v))).unwrap_or_default()
    }
}

/// One boolean per category, indexed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelFlags([bool; CATEGORY_COUNT]);

impl LabelFlags {
    /// Flags with the given keys active; unknown keys are ignored.
    pub fn from_active<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut flags = Self::default();
        for key in keys {
            flags.set(key, true);
        }
        flags
    }

    /// Flags built from raw values in declaration order.
    pub fn from_array(values: [bool; CATEGORY_COUNT]) -> Self {
        Self(values)
    }

    /// Whether the category with `key` is active. Unknown keys read as false.
    pub fn get(&self, key: &str) -> bool {
        category_index(key).is_some_and(|idx| self.0[idx])
    }

    /// Set the flag for `key`. Returns false if the key is unknown.
    pub fn set(&mut self, key: &str, active: bool) -> bool {
        match category_index(key) {
            Some(idx) => {
                self.0[idx] = active;
                true
            }
            None => false,
        }
    }

    /// Flip the flag for `key`, returning the new value.
    pub fn toggle(&mut self, key: &str) -> Option<bool> {
        let idx = category_index(key)?;
        self.0[idx] = !self.0[idx];
        Some(self.0[idx])
    }

    /// Raw values in declaration order.
    pub fn values(&self) -> [bool; CATEGORY_COUNT] {
        self.0
    }

    /// Categories paired with their flag, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static Category, bool)> + '_ {
        CATEGORIES.iter().zip(self.0.iter().copied())
    }

    /// Active categories in declaration order.
    pub fn active(&self) -> impl Iterator<Item = &'static Category> + '_ {
        self.iter()
            .filter_map(|(category, active)| active.then_some(category))
    }

    /// Categories that are active here but not in `next`.
    pub fn deactivated_in<'a>(
        &'a self,
        next: &'a LabelFlags,
    ) -> impl Iterator<Item = &'static Category> + 'a {
        CATEGORIES
            .iter()
            .enumerate()
            .filter(move |(idx, _)| self.0[*idx] && !next.0[*idx])
            .map(|(_, category)| category)
    }
}

/// Categories whose follow-up must be answered for the given flags.
///
/// A category qualifies when it is active and owns either a detail question or
/// the shared intent question. Order follows [`CATEGORIES`].
pub fn required_follow_ups(flags: &LabelFlags) -> Vec<&'static Category> {
    flags
        .active()
        .filter(|category| category.follow_up != FollowUpKind::None)
        .collect()
}
