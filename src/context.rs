use crate::{
    binding::PathBinding,
    error::QueryError,
    schema::SchemaRegistry,
    scope::{ScopeGuard, ScopeStack},
};

pub const DEFAULT_MAX_NESTED_DEPTH: usize = 20;
pub const DEFAULT_MAX_CLAUSE_DEPTH: usize = 64;

/// When content buffered ahead of its `path` is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// As soon as the path arrives
    #[default]
    Eager,
    /// On the first call to an accessor
    Lazy,
}

/// Compiler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub resolution: Resolution,
    /// Deepest allowed chain of nested clauses
    pub max_nested_depth: usize,
    /// Deepest allowed chain of query objects of any kind
    pub max_clause_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            resolution: Resolution::default(),
            max_nested_depth: DEFAULT_MAX_NESTED_DEPTH,
            max_clause_depth: DEFAULT_MAX_CLAUSE_DEPTH,
        }
    }
}

/// State shared by every clause parser during one compilation.
///
/// Owns the scope stack, so a context must not outlive the compilation it
/// was created for and must not be shared between compilations.
pub struct QueryContext<'r> {
    registry: &'r dyn SchemaRegistry,
    scopes: ScopeStack,
    options: CompileOptions,
    filter_context: bool,
    clause_depth: usize,
}

impl<'r> QueryContext<'r> {
    pub fn new(registry: &'r dyn SchemaRegistry) -> Self {
        Self::with_options(registry, CompileOptions::default())
    }

    pub fn with_options(registry: &'r dyn SchemaRegistry, options: CompileOptions) -> Self {
        QueryContext {
            registry,
            scopes: ScopeStack::new(),
            options,
            filter_context: false,
            clause_depth: 0,
        }
    }

    pub fn registry(&self) -> &'r dyn SchemaRegistry {
        self.registry
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Whether the clause being parsed sits in a non-scoring position.
    pub fn is_filter_context(&self) -> bool {
        self.filter_context
    }

    /// Switches filter context on or off and returns the previous setting.
    pub(crate) fn set_filter_context(&mut self, filter_context: bool) -> bool {
        std::mem::replace(&mut self.filter_context, filter_context)
    }

    /// Number of query objects currently being parsed.
    pub fn clause_depth(&self) -> usize {
        self.clause_depth
    }

    pub(crate) fn enter_clause(&mut self) -> Result<(), QueryError> {
        if self.clause_depth >= self.options.max_clause_depth {
            return Err(QueryError::ClauseTooDeep {
                limit: self.options.max_clause_depth,
            });
        }
        self.clause_depth += 1;
        Ok(())
    }

    pub(crate) fn leave_clause(&mut self) {
        self.clause_depth -= 1;
    }

    /// Pushes a scope for `binding`; the scope is popped when the guard drops.
    pub fn enter_scope(
        &mut self,
        binding: &PathBinding,
    ) -> Result<ScopeGuard<'_, QueryContext<'r>>, QueryError> {
        if self.scopes.depth() >= self.options.max_nested_depth {
            return Err(QueryError::NestingTooDeep {
                limit: self.options.max_nested_depth,
            });
        }
        Ok(ScopeGuard::enter(self, binding))
    }
}

impl AsMut<ScopeStack> for QueryContext<'_> {
    fn as_mut(&mut self) -> &mut ScopeStack {
        &mut self.scopes
    }
}
