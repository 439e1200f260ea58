use crate::error::ConfigError;
use crate::field::FieldDescriptor;
use crate::provider::{BoxError, Provided, Provider};
use crate::setter::{FieldSlot, set_field};
use clap::{Arg, ArgAction, ColorChoice, Command, value_parser};
use std::collections::HashMap;
use std::ffi::OsString;
use std::{env, fmt};

pub const FLAG_PROVIDER_NAME: &str = "FlagProvider";

const POSITIONAL_ID: &str = "__positional";

/// Errors raised while parsing the command line against the declared flags
#[derive(Debug)]
pub enum FlagError {
    /// A `flag` tag that can't be used as a long flag name
    InvalidName { flag: String, field: String },
    /// Two fields declare the same flag
    Duplicate {
        flag: String,
        first: String,
        second: String,
    },
    /// The command line doesn't match the declared flags
    Parse(clap::Error),
}

impl fmt::Display for FlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagError::InvalidName { flag, field } => write!(
                f,
                "flag '{}' declared by {} is not a valid long flag name",
                flag, field
            ),
            FlagError::Duplicate {
                flag,
                first,
                second,
            } => write!(
                f,
                "flag --{} is declared by both {} and {}",
                flag, first, second
            ),
            FlagError::Parse(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for FlagError {}

/// Sets fields from the command line flag named by their `flag` tag
///
/// Arguments are parsed once in `init` with a `clap` command built from the declared
/// flags. Accepted forms are `--name value` and `--name=value`; boolean fields also
/// accept a bare `--name`. Everything from `--` or the first positional argument on is
/// left alone.
#[derive(Debug, Clone, Default)]
pub struct FlagProvider {
    args: Option<Vec<OsString>>,
    values: HashMap<String, String>,
}

impl FlagProvider {
    /// Parse the process arguments (without the program name)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an explicit argument list instead of the process arguments
    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: Some(args.into_iter().map(Into::into).collect()),
            values: HashMap::new(),
        }
    }

    fn parse(&mut self, fields: &[FieldDescriptor], args: Vec<OsString>) -> Result<(), FlagError> {
        let mut declared: HashMap<&'static str, &FieldDescriptor> = HashMap::new();
        let mut command = Command::new("flags")
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .color(ColorChoice::Never)
            .args_override_self(true)
            .arg(
                Arg::new(POSITIONAL_ID)
                    .num_args(1..)
                    .trailing_var_arg(true)
                    .value_parser(value_parser!(OsString)),
            );

        for field in fields {
            let Some(flag) = field.tag("flag").filter(|flag| !flag.is_empty()) else {
                continue;
            };
            if !is_valid_name(flag) {
                return Err(FlagError::InvalidName {
                    flag: flag.to_string(),
                    field: field.name.to_string(),
                });
            }
            if let Some(first) = declared.insert(flag, field) {
                return Err(FlagError::Duplicate {
                    flag: flag.to_string(),
                    first: first.name.to_string(),
                    second: field.name.to_string(),
                });
            }

            let mut arg = Arg::new(flag).long(flag).action(ArgAction::Set);
            if field.kind.is_bool() {
                arg = arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true");
            }
            command = command.arg(arg);
        }

        let matches = command
            .try_get_matches_from(args)
            .map_err(FlagError::Parse)?;

        self.values.clear();
        for flag in declared.keys() {
            if let Ok(Some(value)) = matches.try_get_one::<String>(flag) {
                self.values.insert(flag.to_string(), value.clone());
            }
        }

        Ok(())
    }
}

/// Drop the program name from a process argument list
fn command_line(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter().skip(1).collect()
}

fn is_valid_name(flag: &str) -> bool {
    flag != POSITIONAL_ID
        && !flag.starts_with('-')
        && !flag.contains('=')
        && !flag.chars().any(char::is_whitespace)
}

impl Provider for FlagProvider {
    fn name(&self) -> &str {
        FLAG_PROVIDER_NAME
    }

    fn init(&mut self, fields: &[FieldDescriptor]) -> Result<(), BoxError> {
        let args = match &self.args {
            Some(args) => args.clone(),
            None => command_line(env::args_os()),
        };
        self.parse(fields, args)?;
        Ok(())
    }

    fn provide(
        &self,
        field: &FieldDescriptor,
        slot: &mut dyn FieldSlot,
    ) -> Result<Provided, ConfigError> {
        let Some(value) = field.tag("flag").and_then(|flag| self.values.get(flag)) else {
            return Ok(Provided::NotApplicable);
        };

        set_field(field, slot, value)?;
        Ok(Provided::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setter::Kind;

    const PORT: FieldDescriptor = FieldDescriptor {
        name: "port",
        type_name: "u16",
        kind: Kind::Uint,
        tags: &[("flag", "port")],
    };

    const VERBOSE: FieldDescriptor = FieldDescriptor {
        name: "verbose",
        type_name: "bool",
        kind: Kind::Bool,
        tags: &[("flag", "verbose")],
    };

    const HOST: FieldDescriptor = FieldDescriptor {
        name: "host",
        type_name: "String",
        kind: Kind::Str,
        tags: &[("env", "HOST")],
    };

    fn init(args: &[&str]) -> Result<FlagProvider, BoxError> {
        let mut provider = FlagProvider::with_args(args.iter().copied());
        provider.init(&[PORT, VERBOSE, HOST])?;
        Ok(provider)
    }

    fn value<'a>(provider: &'a FlagProvider, flag: &str) -> Option<&'a str> {
        provider.values.get(flag).map(String::as_str)
    }

    #[test]
    fn test_separate_and_inline_values() {
        let provider = init(&["--port", "9000"]).unwrap();
        assert_eq!(value(&provider, "port"), Some("9000"));

        let provider = init(&["--port=9001"]).unwrap();
        assert_eq!(value(&provider, "port"), Some("9001"));
    }

    #[test]
    fn test_last_occurrence_wins() {
        let provider = init(&["--port", "1", "--port", "2"]).unwrap();
        assert_eq!(value(&provider, "port"), Some("2"));
    }

    #[test]
    fn test_bare_bool_flag() {
        let provider = init(&["--verbose", "--port", "1"]).unwrap();
        assert_eq!(value(&provider, "verbose"), Some("true"));

        let provider = init(&["--verbose=false"]).unwrap();
        assert_eq!(value(&provider, "verbose"), Some("false"));
    }

    #[test]
    fn test_stops_at_positional_and_terminator() {
        let provider = init(&["serve", "--port", "1"]).unwrap();
        assert!(provider.values.is_empty());

        let provider = init(&["--verbose", "--", "--port", "1"]).unwrap();
        assert_eq!(value(&provider, "verbose"), Some("true"));
        assert_eq!(value(&provider, "port"), None);
    }

    #[test]
    fn test_undeclared_flag() {
        let err = init(&["--host", "x"]).unwrap_err();
        assert!(err.to_string().contains("--host"));
    }

    #[test]
    fn test_missing_value() {
        let err = init(&["--port"]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("--port"));
        assert!(message.contains("value is required"));
    }

    #[test]
    fn test_duplicate_declaration() {
        let other = FieldDescriptor {
            name: "listen",
            ..PORT
        };
        let mut provider = FlagProvider::with_args(Vec::<String>::new());
        let err = provider.init(&[PORT, other]).unwrap_err();

        assert_eq!(
            err.to_string(),
            "flag --port is declared by both port and listen"
        );
    }

    #[test]
    fn test_invalid_flag_names() {
        for flag in ["--port", "-p", "port=1", "max conn", "__positional"] {
            let field = FieldDescriptor {
                tags: Box::leak(Box::new([("flag", flag)])),
                ..PORT
            };
            let mut provider = FlagProvider::with_args(["--port", "1"]);
            let err = provider.init(&[field]).unwrap_err();

            assert_eq!(
                err.to_string(),
                format!("flag '{}' declared by port is not a valid long flag name", flag)
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_arguments_are_left_alone() {
        use std::os::unix::ffi::OsStringExt;

        let raw = || OsString::from_vec(vec![0xff]);

        let mut provider = FlagProvider::with_args(vec![
            OsString::from("--port"),
            OsString::from("1"),
            OsString::from("--"),
            raw(),
        ]);
        provider.init(&[PORT, VERBOSE]).unwrap();
        assert_eq!(value(&provider, "port"), Some("1"));

        let mut provider =
            FlagProvider::with_args(vec![raw(), OsString::from("--port"), OsString::from("1")]);
        provider.init(&[PORT, VERBOSE]).unwrap();
        assert!(provider.values.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_flag_value_is_an_error() {
        use std::os::unix::ffi::OsStringExt;

        let mut provider =
            FlagProvider::with_args(vec![OsString::from_vec(b"--port=\xff".to_vec())]);
        let err = provider.init(&[PORT]).unwrap_err();
        assert!(matches!(err.downcast_ref::<FlagError>(), Some(FlagError::Parse(_))));
    }

    #[test]
    fn test_command_line_drops_program_name() {
        let args = command_line(["chain-demo", "--port", "1"].map(OsString::from));
        assert_eq!(args, vec![OsString::from("--port"), OsString::from("1")]);
        assert!(command_line(Vec::new()).is_empty());
    }

    #[test]
    fn test_new_reads_process_arguments() {
        // the harness's own arguments aren't declared flags, so only a clean outcome matters
        let mut provider = FlagProvider::new();
        if provider.init(&[]).is_ok() {
            assert!(provider.values.is_empty());
        }
    }

    #[test]
    fn test_provide() {
        let provider = init(&["--port=8443"]).unwrap();

        let mut port: u16 = 0;
        assert_eq!(provider.provide(&PORT, &mut port).unwrap(), Provided::Applied);
        assert_eq!(port, 8443);

        let mut verbose = false;
        assert_eq!(
            provider.provide(&VERBOSE, &mut verbose).unwrap(),
            Provided::NotApplicable
        );

        let mut host = String::new();
        assert_eq!(
            provider.provide(&HOST, &mut host).unwrap(),
            Provided::NotApplicable
        );
    }

    #[test]
    fn test_provide_conversion_failure() {
        let provider = init(&["--port=http"]).unwrap();

        let mut port: u16 = 0;
        let result = provider.provide(&PORT, &mut port);
        assert!(matches!(result, Err(ConfigError::Conversion { .. })));
    }
}
