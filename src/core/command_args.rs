//! Argument vector construction for a single cleartool invocation.
//!
//! [`CommandArgs`] appends file operands to a base parameter list. A version
//! qualifier switches to the `file@@version` extended pathname form, which only
//! addresses a single file; callers must not pair a version with several files.

/// Builds the argv for one cleartool call
pub struct CommandArgs;

impl CommandArgs {
    /// Append file operands (and an optional version qualifier) to `params`.
    ///
    /// # Examples
    /// ```
    /// use clearcase_navigator::core::command_args::CommandArgs;
    ///
    /// let argv = CommandArgs::build(vec!["get".into(), "-to".into(), "/tmp/x".into()], &["a.c".into()], Some("/main/4"));
    /// assert_eq!(argv, vec!["get", "-to", "/tmp/x", "a.c@@/main/4"]);
    /// ```
    pub fn build(params: Vec<String>, files: &[String], version: Option<&str>) -> Vec<String> {
        let mut argv = params;
        if files.is_empty() {
            return argv;
        }

        match version.filter(|v| !v.is_empty()) {
            Some(version) => {
                // Only the first file can carry a version; see module docs.
                argv.push(format!("{}@@{}", files[0], version));
            }
            None => argv.extend(files.iter().cloned()),
        }

        argv
    }
}
