use serde::{Deserialize, Serialize};

/// Outcome a single step reports to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Failed,
    Passed,
    Warning,
    Undecided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub faulty: bool,
    pub successful: bool,
    pub warning: bool,
}

/// Folds verdicts in arrival order. The last `Failed`/`Passed` wins: a later
/// pass clears an earlier failure and a later failure overturns an earlier
/// pass. Warnings are tracked on their own and never change the pass/fail
/// outcome. `Undecided` keeps whatever came before.
pub fn summarize<I>(verdicts: I) -> VerdictSummary
where
    I: IntoIterator<Item = Verdict>,
{
    let mut decisive: Option<Verdict> = None;
    let mut warning = false;
    for verdict in verdicts {
        match verdict {
            Verdict::Failed | Verdict::Passed => decisive = Some(verdict),
            Verdict::Warning => warning = true,
            Verdict::Undecided => {}
        }
    }
    VerdictSummary {
        faulty: decisive == Some(Verdict::Failed),
        successful: decisive == Some(Verdict::Passed),
        warning,
    }
}
