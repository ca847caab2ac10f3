//! Static grade-wave table, race subgroups and subjects

use serde::Serialize;

use super::error::{AnalysisError, AnalysisResult};

/// Column names for one spring data-collection round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeWave {
    /// Position in `GRADE_WAVES`
    pub grade_index: usize,
    /// Human-readable grade
    pub label: &'static str,
    /// Data-collection round the columns come from
    pub round: u8,
    /// Teacher-rated approaches to learning, self-control, interpersonal, externalizing
    pub predictor_columns: [&'static str; 4],
    pub reading_column: &'static str,
    pub math_column: &'static str,
}

impl GradeWave {
    /// Outcome column for a subject
    pub fn outcome_column(&self, subject: Subject) -> &'static str {
        match subject {
            Subject::Reading => self.reading_column,
            Subject::Math => self.math_column,
        }
    }

    /// Predictor and outcome columns of this wave
    pub fn measure_columns(&self) -> impl Iterator<Item = &'static str> {
        self.predictor_columns
            .into_iter()
            .chain([self.reading_column, self.math_column])
    }
}

pub static GRADE_WAVES: [GradeWave; 6] = [
    GradeWave {
        grade_index: 0,
        label: "Kindergarten",
        round: 2,
        predictor_columns: ["X2TCHAPP", "X2TCHCON", "X2TCHPER", "X2TCHEXT"],
        reading_column: "X2RTHETK5",
        math_column: "X2MTHETK5",
    },
    GradeWave {
        grade_index: 1,
        label: "Grade 1",
        round: 4,
        predictor_columns: ["X4TCHAPP", "X4TCHCON", "X4TCHPER", "X4TCHEXT"],
        reading_column: "X4RTHETK5",
        math_column: "X4MTHETK5",
    },
    GradeWave {
        grade_index: 2,
        label: "Grade 2",
        round: 6,
        predictor_columns: ["X6TCHAPP", "X6TCHCON", "X6TCHPER", "X6TCHEXT"],
        reading_column: "X6RTHETK5",
        math_column: "X6MTHETK5",
    },
    GradeWave {
        grade_index: 3,
        label: "Grade 3",
        round: 7,
        predictor_columns: ["X7TCHAPP", "X7TCHCON", "X7TCHPER", "X7TCHEXT"],
        reading_column: "X7RTHETK5",
        math_column: "X7MTHETK5",
    },
    GradeWave {
        grade_index: 4,
        label: "Grade 4",
        round: 8,
        predictor_columns: ["X8TCHAPP", "X8TCHCON", "X8TCHPER", "X8TCHEXT"],
        reading_column: "X8RTHETK5",
        math_column: "X8MTHETK5",
    },
    GradeWave {
        grade_index: 5,
        label: "Grade 5",
        round: 9,
        predictor_columns: ["X9TCHAPP", "X9TCHCON", "X9TCHPER", "X9TCHEXT"],
        reading_column: "X9RTHETK5",
        math_column: "X9MTHETK5",
    },
];

/// Look up a wave by index
pub fn grade_wave(index: usize) -> AnalysisResult<&'static GradeWave> {
    GRADE_WAVES.get(index).ok_or(AnalysisError::UnknownGrade {
        index,
        available: GRADE_WAVES.len(),
    })
}

/// Race subgroups reported by the batch driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RaceGroup {
    Black,
    Hispanic,
}

impl RaceGroup {
    pub const ALL: [RaceGroup; 2] = [RaceGroup::Black, RaceGroup::Hispanic];

    /// 0/1 indicator column for this subgroup
    pub fn column(&self) -> &'static str {
        match self {
            RaceGroup::Black => "X_BLACK_R",
            RaceGroup::Hispanic => "X_HISP_R",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RaceGroup::Black => "Black",
            RaceGroup::Hispanic => "Hispanic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Subject {
    Reading,
    Math,
}

impl Subject {
    pub const ALL: [Subject; 2] = [Subject::Reading, Subject::Math];

    pub fn label(&self) -> &'static str {
        match self {
            Subject::Reading => "Reading",
            Subject::Math => "Math",
        }
    }
}

/// One (grade, race, outcome) regression request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegressionSpec {
    pub grade_index: usize,
    pub race_column: String,
    pub outcome_column: String,
}

impl RegressionSpec {
    pub fn new(
        grade_index: usize,
        race_column: impl Into<String>,
        outcome_column: impl Into<String>,
    ) -> Self {
        Self {
            grade_index,
            race_column: race_column.into(),
            outcome_column: outcome_column.into(),
        }
    }

    /// Build from the typed enums
    pub fn for_group(wave: &GradeWave, race: RaceGroup, subject: Subject) -> Self {
        Self::new(wave.grade_index, race.column(), wave.outcome_column(subject))
    }
}

/// All 24 combinations in report order: wave, then race, then subject
pub fn batch_specs() -> Vec<RegressionSpec> {
    GRADE_WAVES
        .iter()
        .flat_map(|wave| {
            RaceGroup::ALL.into_iter().flat_map(move |race| {
                Subject::ALL
                    .into_iter()
                    .map(move |subject| RegressionSpec::for_group(wave, race, subject))
            })
        })
        .collect()
}

/// Every predictor and outcome column across all waves
pub fn all_measure_columns() -> Vec<&'static str> {
    GRADE_WAVES.iter().flat_map(|w| w.measure_columns()).collect()
}
