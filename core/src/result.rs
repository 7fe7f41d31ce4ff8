use crate::{
    basic::BasicInfo,
    error::{ExtractError, Result, Warning},
    excitation::ExcitationSet,
    population::Population,
};

/// Everything extracted from one job.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedJob {
    basic: BasicInfo,
    excitations: Option<ExcitationSet>,
    population: Option<Population>,
    warnings: Vec<Warning>,
}

impl ParsedJob {
    pub fn builder(basic: BasicInfo) -> ParsedJobBuilder {
        ParsedJobBuilder::new(basic)
    }

    pub fn basic(&self) -> &BasicInfo {
        &self.basic
    }

    pub fn excitations(&self) -> Option<&ExcitationSet> {
        self.excitations.as_ref()
    }

    pub fn population(&self) -> Option<&Population> {
        self.population.as_ref()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Assembles a [`ParsedJob`]. Each optional part can be supplied once.
#[derive(Debug)]
pub struct ParsedJobBuilder {
    basic: BasicInfo,
    excitations: Option<ExcitationSet>,
    population: Option<Population>,
    warnings: Vec<Warning>,
}

impl ParsedJobBuilder {
    pub fn new(basic: BasicInfo) -> Self {
        Self {
            basic,
            excitations: None,
            population: None,
            warnings: Vec::new(),
        }
    }

    pub fn excitations(mut self, excitations: ExcitationSet) -> Result<Self> {
        if self.excitations.is_some() {
            return Err(ExtractError::InvalidArgument(
                "the excitations of a job were supplied twice".to_owned(),
            ));
        }
        self.excitations = Some(excitations);
        Ok(self)
    }

    pub fn population(mut self, population: Population) -> Result<Self> {
        if self.population.is_some() {
            return Err(ExtractError::InvalidArgument(
                "the population analysis of a job was supplied twice".to_owned(),
            ));
        }
        self.population = Some(population);
        Ok(self)
    }

    pub fn warning(mut self, warning: Warning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn warnings(mut self, warnings: impl IntoIterator<Item = Warning>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn build(self) -> ParsedJob {
        ParsedJob {
            basic: self.basic,
            excitations: self.excitations,
            population: self.population,
            warnings: self.warnings,
        }
    }
}
