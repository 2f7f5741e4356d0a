//! Basic graph patterns written with textual atoms and named variables.

use rdf_bucket_common::{AtomDictionary, EngineError, EngineResult};
use rdf_bucket_logical::{FilterExpression, VariableFilter};
use rdf_bucket_model::{Atom, TripleItem, TriplePattern, Variable};

/// A basic graph pattern together with the filters on its results.
///
/// Variables are numbered from one in the order of their first occurrence. The query keeps
/// their names for decoding the results.
#[derive(Debug, Clone, Default)]
pub struct Query {
    patterns: Vec<TriplePattern>,
    filters: Vec<VariableFilter>,
    variables: Vec<String>,
}

impl Query {
    pub fn patterns(&self) -> &[TriplePattern] {
        &self.patterns
    }

    pub fn filters(&self) -> &[VariableFilter] {
        &self.filters
    }

    /// Returns the variable called `name` (without the leading `?`).
    pub fn variable(&self, name: &str) -> Option<Variable> {
        self.variables
            .iter()
            .position(|candidate| candidate == name)
            .map(variable_at)
    }

    pub fn variable_name(&self, variable: Variable) -> Option<&str> {
        let index = usize::try_from(variable.id()).ok()?.checked_sub(1)?;
        self.variables.get(index).map(String::as_str)
    }

    /// Iterates over the variables and their names.
    pub fn variables(&self) -> impl Iterator<Item = (Variable, &str)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(index, name)| (variable_at(index), name.as_str()))
    }
}

/// Builds a [Query] from textual triple patterns.
///
/// A term starting with `?` is a variable; every other term is looked up in the atom dictionary
/// and fails with a [NotFoundError](rdf_bucket_common::NotFoundError) if the database does not
/// know it.
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    dictionary: &'a dyn AtomDictionary,
    query: Query,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(dictionary: &'a dyn AtomDictionary) -> Self {
        Self {
            dictionary,
            query: Query::default(),
        }
    }

    /// Adds the pattern `subject predicate object`.
    pub fn pattern(mut self, subject: &str, predicate: &str, object: &str) -> EngineResult<Self> {
        let pattern = TriplePattern::new(
            self.item(subject)?,
            self.item(predicate)?,
            self.item(object)?,
        );
        self.query.patterns.push(pattern);
        Ok(self)
    }

    /// Restricts the results to those whose `variable` satisfies `expression`.
    ///
    /// The variable must already occur in a pattern.
    pub fn filter(mut self, variable: &str, expression: FilterExpression) -> EngineResult<Self> {
        let name = variable.strip_prefix('?').unwrap_or(variable);
        let Some(variable) = self.query.variable(name) else {
            return Err(EngineError::configuration(format!(
                "The filtered variable ?{name} does not occur in any pattern."
            )));
        };
        self.query
            .filters
            .push(VariableFilter::new(variable, expression));
        Ok(self)
    }

    /// Looks up the atom of `text`, e.g., for building a [FilterExpression].
    pub fn atom(&self, text: &str) -> EngineResult<Atom> {
        self.dictionary.internal_of(text)
    }

    pub fn build(self) -> EngineResult<Query> {
        if self.query.patterns.is_empty() {
            return Err(EngineError::configuration(
                "A query needs at least one pattern.",
            ));
        }
        Ok(self.query)
    }

    fn item(&mut self, text: &str) -> EngineResult<TripleItem> {
        let Some(name) = text.strip_prefix('?') else {
            return Ok(self.dictionary.internal_of(text)?.into());
        };
        if name.is_empty() {
            return Err(EngineError::configuration("A variable needs a name."));
        }
        let variable = match self.query.variable(name) {
            Some(variable) => variable,
            None => {
                self.query.variables.push(name.to_owned());
                variable_at(self.query.variables.len() - 1)
            }
        };
        Ok(variable.into())
    }
}

fn variable_at(index: usize) -> Variable {
    Variable(i64::try_from(index).unwrap_or(i64::MAX - 1) + 1)
}
