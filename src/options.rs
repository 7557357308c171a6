/// Switches consulted by the analysis and the code generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Use constant propagation results to fold expressions and drop dead
    /// branches.
    pub folding_enabled: bool,
    /// Interleave `#` comments describing each construct into the assembly.
    pub trace_enabled: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            folding_enabled: true,
            trace_enabled: false,
        }
    }
}
