use serde::{Deserialize, Serialize};

/// One step of the fixed authoring pipeline, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Upload or point to material, then analyse it.
    Source,
    /// Choose topics and class level.
    Contextual,
    /// Choose framework and Bloom levels.
    Pedagogical,
    /// Generate and review the syllabus.
    Syllabus,
    /// Generate and review the course plan.
    CoursePlan,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Self::Source,
        Self::Contextual,
        Self::Pedagogical,
        Self::Syllabus,
        Self::CoursePlan,
    ];

    pub const FIRST: Stage = Self::Source;
    pub const LAST: Stage = Self::CoursePlan;

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn successor(&self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn predecessor(&self) -> Option<Stage> {
        self.index().checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Stages strictly before this one, in pipeline order.
    pub fn predecessors(&self) -> &'static [Stage] {
        &Self::ALL[..self.index()]
    }

    /// This stage and every stage after it.
    pub fn downstream_inclusive(&self) -> &'static [Stage] {
        &Self::ALL[self.index()..]
    }

    pub fn is_terminal(&self) -> bool {
        self.successor().is_none()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Contextual => "contextual",
            Self::Pedagogical => "pedagogical",
            Self::Syllabus => "syllabus",
            Self::CoursePlan => "course_plan",
        }
    }

    /// Step title shown in the progress rail.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Contextual => "Contextual Information",
            Self::Pedagogical => "Learning Objective",
            Self::Syllabus => "Design",
            Self::CoursePlan => "Export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Source => "Select starting resources.",
            Self::Contextual => "Provide information on the didactic context.",
            Self::Pedagogical => "Identify the learning objectives.",
            Self::Syllabus => "Create learning activities.",
            Self::CoursePlan => "Save and export.",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successor_chain_covers_all_stages() {
        let mut stage = Stage::FIRST;
        let mut visited = vec![stage];
        while let Some(next) = stage.successor() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, Stage::ALL.to_vec());
        assert_eq!(stage, Stage::LAST);
    }

    #[test]
    fn predecessor_is_inverse_of_successor() {
        for stage in Stage::ALL {
            if let Some(next) = stage.successor() {
                assert_eq!(next.predecessor(), Some(stage));
            }
        }
        assert_eq!(Stage::Source.predecessor(), None);
    }

    #[test]
    fn only_course_plan_is_terminal() {
        let terminal: Vec<_> = Stage::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&Stage::CoursePlan]);
    }

    #[test]
    fn predecessors_and_downstream() {
        assert!(Stage::Source.predecessors().is_empty());
        assert_eq!(
            Stage::Syllabus.predecessors(),
            &[Stage::Source, Stage::Contextual, Stage::Pedagogical]
        );
        assert_eq!(
            Stage::Syllabus.downstream_inclusive(),
            &[Stage::Syllabus, Stage::CoursePlan]
        );
    }

    #[test]
    fn ordering_matches_pipeline() {
        assert!(Stage::Source < Stage::Contextual);
        assert!(Stage::Syllabus < Stage::CoursePlan);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&Stage::CoursePlan).unwrap();
        assert_eq!(json, "\"course_plan\"");
    }
}
