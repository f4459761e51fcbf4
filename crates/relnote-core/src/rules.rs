use crate::markdown::Notes;

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A fn-pointer analyzer rule: no captures, no heap allocation.
///
/// `condition` sees the findings accumulated by earlier rules, which is how
/// precedence between overlapping heuristics is expressed (an explicit
/// section suppressing keyword matching, for example).
pub struct Rule<S> {
    pub id: &'static str,
    pub condition: fn(&S) -> bool,
    pub apply: fn(&Notes, &mut S),
}

macro_rules! rule {
    (
        id: $id:expr,
        apply: $apply:expr
        $(, when: $cond:expr)?
    ) => {
        $crate::rules::Rule {
            id: $id,
            condition: {
                #[allow(unused_assignments, unused_mut)]
                let mut c: fn(&_) -> bool = $crate::rules::always;
                $(c = $cond;)?
                c
            },
            apply: $apply,
        }
    };
}

pub(crate) use rule;

pub fn always<S>(_: &S) -> bool {
    true
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// Ordered list of rules run against one set of notes.
pub struct RuleSet<S> {
    rules: Vec<Rule<S>>,
}

impl<S> RuleSet<S> {
    pub fn new(rules: Vec<Rule<S>>) -> Self {
        Self { rules }
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id).collect()
    }

    /// Run every rule in order. Rules whose condition is false are skipped.
    pub fn run(&self, notes: &Notes, state: &mut S) {
        for rule in &self.rules {
            if (rule.condition)(state) {
                tracing::debug!(rule = rule.id, "applying analyzer rule");
                (rule.apply)(notes, state);
            } else {
                tracing::debug!(rule = rule.id, "analyzer rule suppressed");
            }
        }
    }
}
