use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    future::Future,
    rc::Rc,
};

use futures::FutureExt;
use shell_contract::{wants_help, ArgValue, ParamKind, RawArg, ResolvedArgs, ShellError};

use crate::{CommandContext, CommandHandler};

/// Declared shape of one command argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    alias: Option<String>,
    kind: ParamKind,
    required: bool,
    positional: bool,
    description: String,
}

impl Parameter {
    /// Argument filled by position, in declaration order among positional parameters.
    pub fn positional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self::build(name, kind, description, true)
    }

    /// Argument passed as `--name value` or through its alias.
    pub fn named(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self::build(name, kind, description, false)
    }

    /// Presence-only switch such as `--verbose`.
    pub fn flag(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::build(name, ParamKind::Flag, description, false)
    }

    fn build(
        name: impl Into<String>,
        kind: ParamKind,
        description: impl Into<String>,
        positional: bool,
    ) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind,
            required: false,
            positional,
            description: description.into(),
        }
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the short alias (without the leading dash).
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into()).filter(|alias: &String| !alias.is_empty());
        self
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional short alias.
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Declared kind.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Whether the parameter must be supplied.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the parameter is filled by position.
    pub fn is_positional(&self) -> bool {
        self.positional
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Coerces one raw value into this parameter's kind.
    pub fn coerce(&self, raw: &RawArg) -> Result<ArgValue, ShellError> {
        self.coerce_with(raw, ShellError::invalid_argument)
    }

    fn coerce_with(
        &self,
        raw: &RawArg,
        error: fn(&str, ParamKind, &str) -> ShellError,
    ) -> Result<ArgValue, ShellError> {
        let invalid = || error(&self.name, self.kind, raw.display());
        match (self.kind, raw) {
            (ParamKind::Flag | ParamKind::Boolean, RawArg::Present) => Ok(ArgValue::Boolean(true)),
            (ParamKind::Flag | ParamKind::Boolean, RawArg::Value(value)) => {
                parse_bool(value).map(ArgValue::Boolean).ok_or_else(invalid)
            }
            (ParamKind::Text, RawArg::Value(value)) => Ok(ArgValue::Text(value.clone())),
            (ParamKind::Integer, RawArg::Value(value)) => value
                .trim()
                .parse::<i64>()
                .map(ArgValue::Integer)
                .map_err(|_| invalid()),
            (ParamKind::Text | ParamKind::Integer, RawArg::Present) => Err(invalid()),
        }
    }

    fn lookup<'a>(&self, named: &'a BTreeMap<String, RawArg>) -> Option<&'a RawArg> {
        named
            .get(&self.name)
            .or_else(|| self.alias.as_ref().and_then(|alias| named.get(alias)))
    }

    fn help_line(&self) -> String {
        let display = if self.positional {
            self.name.clone()
        } else {
            format!("--{}", self.name)
        };
        let alias = self
            .alias
            .as_ref()
            .map(|alias| format!("alias: -{alias}, "))
            .unwrap_or_default();
        let required = if self.required && !self.positional {
            ", required"
        } else {
            ""
        };
        format!(
            "{display} ({alias}type: {}{required}): {}",
            self.kind, self.description
        )
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Result of [`Command::call`] that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Help was requested; carries the rendered help text and the handler did not run.
    Help(String),
    /// The handler ran to completion.
    Completed,
}

/// Named, described, validated unit of behavior.
#[derive(Clone)]
pub struct Command {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    handler: CommandHandler,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Creates a command, rejecting malformed schemas.
    ///
    /// # Errors
    ///
    /// Returns a [`shell_contract::ShellErrorCode::Construction`] error when the command name is
    /// empty or contains whitespace, a parameter name is empty, or two parameters share a name
    /// or an alias.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<Parameter>,
        handler: CommandHandler,
    ) -> Result<Self, ShellError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ShellError::construction(format!(
                "invalid command name `{name}`"
            )));
        }

        let mut names = BTreeSet::new();
        let mut aliases = BTreeSet::new();
        for parameter in &parameters {
            if parameter.name.is_empty() {
                return Err(ShellError::construction(format!(
                    "command `{name}` declares a parameter without a name"
                )));
            }
            if !names.insert(parameter.name.as_str()) {
                return Err(ShellError::construction(format!(
                    "Duplicate parameter name `{}` in command `{name}`",
                    parameter.name
                )));
            }
            if let Some(alias) = parameter.alias.as_deref() {
                if !aliases.insert(alias) {
                    return Err(ShellError::construction(format!(
                        "Duplicate parameter alias `{alias}` in command `{name}`"
                    )));
                }
            }
        }

        Ok(Self {
            name,
            description: description.into(),
            parameters,
            handler,
        })
    }

    /// Creates a command from an async closure.
    ///
    /// # Errors
    ///
    /// Same as [`Command::new`].
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<Parameter>,
        handler: F,
    ) -> Result<Self, ShellError>
    where
        F: Fn(CommandContext, ResolvedArgs) -> Fut + 'static,
        Fut: Future<Output = Result<(), ShellError>> + 'static,
    {
        Self::new(
            name,
            description,
            parameters,
            Rc::new(move |context, args| handler(context, args).boxed_local()),
        )
    }

    /// Built-in commands have fixed, known-good schemas and skip validation.
    pub(crate) fn builtin<F, Fut>(
        name: &str,
        description: &str,
        parameters: Vec<Parameter>,
        handler: F,
    ) -> Self
    where
        F: Fn(CommandContext, ResolvedArgs) -> Fut + 'static,
        Fut: Future<Output = Result<(), ShellError>> + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            handler: Rc::new(move |context, args| handler(context, args).boxed_local()),
        }
    }

    /// Command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters in declaration order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Validates and coerces raw arguments against the parameter list.
    ///
    /// Positional parameters take positional slots in declaration order; a positional parameter
    /// whose slot is empty may still be supplied by name or alias.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument` for an absent required parameter and `InvalidArgument` when a
    /// value cannot be coerced. Values taken from positional slots are reported as positional.
    pub fn resolve(
        &self,
        positional: &[String],
        named: &BTreeMap<String, RawArg>,
    ) -> Result<ResolvedArgs, ShellError> {
        let mut slots = positional.iter();
        let mut resolved = ResolvedArgs::new();

        for parameter in &self.parameters {
            let slot = if parameter.positional { slots.next() } else { None };
            let value = match slot {
                Some(slot) => Some(parameter.coerce_with(
                    &RawArg::Value(slot.clone()),
                    ShellError::invalid_positional,
                )?),
                None => parameter
                    .lookup(named)
                    .map(|raw| parameter.coerce(raw))
                    .transpose()?,
            };

            match value {
                Some(value) => resolved.insert(parameter.name.clone(), value),
                None if parameter.required && parameter.positional => {
                    return Err(ShellError::missing_positional(&parameter.name));
                }
                None if parameter.required => {
                    return Err(ShellError::missing_argument(&parameter.name));
                }
                None => {}
            }
        }

        Ok(resolved)
    }

    /// Validates arguments and runs the handler.
    ///
    /// A `h` or `help` named argument short-circuits to [`CallOutcome::Help`] without running
    /// the handler.
    ///
    /// # Errors
    ///
    /// Propagates validation failures from [`Command::resolve`] and any handler failure.
    pub async fn call(
        &self,
        context: CommandContext,
        positional: Vec<String>,
        named: BTreeMap<String, RawArg>,
    ) -> Result<CallOutcome, ShellError> {
        if wants_help(&named) {
            return Ok(CallOutcome::Help(self.help_statement()));
        }

        let args = self.resolve(&positional, &named)?;
        log::debug!("calling command `{}` with {:?}", self.name, args);
        (self.handler)(context, args).await?;
        Ok(CallOutcome::Completed)
    }

    /// Help text: a summary line followed by one tab-indented line per parameter.
    pub fn help_statement(&self) -> String {
        let mut out = format!("{} - {}", self.name, self.description);
        for parameter in &self.parameters {
            out.push_str("\n\t");
            out.push_str(&parameter.help_line());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use shell_contract::ShellErrorCode;

    use super::*;
    use crate::{BufferSink, Context, Session};

    fn noop(
        name: &str,
        parameters: Vec<Parameter>,
    ) -> Result<Command, ShellError> {
        Command::from_fn(name, "test command", parameters, |_, _| async { Ok(()) })
    }

    fn named_args(pairs: &[(&str, &str)]) -> BTreeMap<String, RawArg> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), RawArg::Value(value.to_string())))
            .collect()
    }

    fn text(value: &str) -> ArgValue {
        ArgValue::Text(value.to_string())
    }

    fn session() -> Session {
        Session::new(Context::new("root", "> "), Rc::new(BufferSink::new()))
    }

    #[test]
    fn duplicate_parameter_names_fail_construction() {
        let error = noop(
            "find",
            vec![
                Parameter::positional("word", ParamKind::Text, "word"),
                Parameter::named("word", ParamKind::Text, "again"),
            ],
        )
        .expect_err("duplicate name");
        assert_eq!(error.code, ShellErrorCode::Construction);
    }

    #[test]
    fn duplicate_aliases_fail_construction() {
        let error = noop(
            "list",
            vec![
                Parameter::named("language", ParamKind::Text, "language").alias("l"),
                Parameter::named("limit", ParamKind::Integer, "limit").alias("l"),
            ],
        )
        .expect_err("duplicate alias");
        assert_eq!(error.code, ShellErrorCode::Construction);
    }

    #[test]
    fn blank_command_name_fails_construction() {
        assert!(noop("", Vec::new()).is_err());
        assert!(noop("two words", Vec::new()).is_err());
    }

    #[test]
    fn missing_required_named_parameter_skips_handler() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let command = Command::from_fn(
            "random",
            "random word",
            vec![Parameter::named("language", ParamKind::Text, "language").required()],
            move |_, _| {
                counter.set(counter.get() + 1);
                async { Ok(()) }
            },
        )
        .expect("command");

        let session = session();
        let error = block_on(command.call(session.command_context(), Vec::new(), BTreeMap::new()))
            .expect_err("missing argument");
        assert_eq!(error.code, ShellErrorCode::MissingArgument);
        assert_eq!(error.message, "Missing required parameter: language");
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn positional_parameters_fill_in_declaration_order() {
        let command = noop(
            "pair",
            vec![
                Parameter::positional("a", ParamKind::Text, "first"),
                Parameter::positional("b", ParamKind::Text, "second"),
            ],
        )
        .expect("command");
        let resolved = command
            .resolve(&["x".to_string(), "y".to_string()], &BTreeMap::new())
            .expect("resolve");
        let expected: ResolvedArgs = [("a", text("x")), ("b", text("y"))].into_iter().collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn missing_required_positional_is_reported() {
        let command = noop(
            "add",
            vec![
                Parameter::positional("word", ParamKind::Text, "word").required(),
                Parameter::positional("language", ParamKind::Text, "language").required(),
            ],
        )
        .expect("command");
        let error = command
            .resolve(&["hola".to_string()], &BTreeMap::new())
            .expect_err("missing");
        assert_eq!(error.code, ShellErrorCode::MissingArgument);
        assert_eq!(error.message, "Missing required positional parameter: language");
    }

    #[test]
    fn aliases_resolve_and_coerce() {
        let command = noop(
            "list",
            vec![
                Parameter::named("language", ParamKind::Text, "language").alias("l"),
                Parameter::named("page", ParamKind::Integer, "page").alias("p"),
                Parameter::named("per_page", ParamKind::Integer, "per page").alias("n"),
            ],
        )
        .expect("command");
        let resolved = command
            .resolve(&[], &named_args(&[("l", "en"), ("p", "2")]))
            .expect("resolve");
        let expected: ResolvedArgs = [("language", text("en")), ("page", ArgValue::Integer(2))]
            .into_iter()
            .collect();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn positional_parameter_accepts_named_value_when_slot_is_empty() {
        let command = noop(
            "find",
            vec![
                Parameter::positional("word", ParamKind::Text, "word").required(),
                Parameter::positional("language", ParamKind::Text, "language"),
            ],
        )
        .expect("command");
        let resolved = command
            .resolve(&["hello".to_string()], &named_args(&[("language", "en")]))
            .expect("resolve");
        assert_eq!(resolved.text("language"), Some("en"));
        assert_eq!(resolved.text("word"), Some("hello"));
    }

    #[test]
    fn coercion_failures_are_invalid_arguments() {
        let command = noop(
            "list",
            vec![Parameter::named("page", ParamKind::Integer, "page").alias("p")],
        )
        .expect("command");
        let error = command
            .resolve(&[], &named_args(&[("p", "two")]))
            .expect_err("invalid");
        assert_eq!(error.code, ShellErrorCode::InvalidArgument);

        let mut named = BTreeMap::new();
        named.insert("page".to_string(), RawArg::Present);
        let error = command.resolve(&[], &named).expect_err("value required");
        assert_eq!(error.code, ShellErrorCode::InvalidArgument);
    }

    #[test]
    fn positional_coercion_failures_name_the_positional_slot() {
        let command = noop(
            "repeat",
            vec![Parameter::positional("count", ParamKind::Integer, "times").required()],
        )
        .expect("command");
        let error = command
            .resolve(&["x".to_string()], &BTreeMap::new())
            .expect_err("invalid");
        assert_eq!(error.code, ShellErrorCode::InvalidArgument);
        assert_eq!(
            error.message,
            "Invalid value for positional parameter 'count': expected integer, got x"
        );

        let error = command
            .resolve(&[], &named_args(&[("count", "x")]))
            .expect_err("invalid");
        assert_eq!(
            error.message,
            "Invalid value for parameter 'count': expected integer, got x"
        );
    }

    #[test]
    fn flags_and_booleans_coerce() {
        let verbose = Parameter::flag("verbose", "verbose output");
        assert_eq!(verbose.coerce(&RawArg::Present), Ok(ArgValue::Boolean(true)));
        assert_eq!(
            verbose.coerce(&RawArg::Value("off".to_string())),
            Ok(ArgValue::Boolean(false))
        );
        let strict = Parameter::named("strict", ParamKind::Boolean, "strict");
        assert!(strict.coerce(&RawArg::Value("maybe".to_string())).is_err());
    }

    #[test]
    fn help_flag_short_circuits_handler() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let command = Command::from_fn(
            "random",
            "Get a random word.",
            vec![Parameter::positional("language", ParamKind::Text, "language").required()],
            move |_, _| {
                counter.set(counter.get() + 1);
                async { Ok(()) }
            },
        )
        .expect("command");
        let mut named = BTreeMap::new();
        named.insert("help".to_string(), RawArg::Present);

        let outcome =
            block_on(command.call(session().command_context(), Vec::new(), named)).expect("help");
        assert_eq!(outcome, CallOutcome::Help(command.help_statement()));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn help_statement_lists_each_parameter_once_in_order() {
        let command = noop(
            "list",
            vec![
                Parameter::positional("word", ParamKind::Text, "word to find").required(),
                Parameter::named("language", ParamKind::Text, "language to filter by").alias("l"),
                Parameter::named("page", ParamKind::Integer, "page of words").required(),
                Parameter::flag("verbose", "verbose output"),
            ],
        )
        .expect("command");
        assert_eq!(
            command.help_statement(),
            "list - test command\n\
             \tword (type: text): word to find\n\
             \t--language (alias: -l, type: text): language to filter by\n\
             \t--page (type: integer, required): page of words\n\
             \t--verbose (type: flag): verbose output"
        );
    }
}
