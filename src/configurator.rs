use crate::Configurable;
use crate::defaults::DefaultProvider;
use crate::engine::Resolver;
use crate::env::EnvProvider;
use crate::error::{ConfigError, format_config_errors};
use crate::provider::Provider;
use std::collections::HashSet;

type ErrorHandler<'a> = Box<dyn FnMut(ConfigError) + 'a>;

/// Populates a configuration struct from an ordered chain of providers
///
/// Providers are consulted in the order they were given: the first one that sets a field
/// wins. Fields no provider can set are handed to the error handler, which panics by
/// default.
///
/// # Example
/// ```rust
/// use config_chain::{Configurable, Configurator, DefaultProvider, EnvProvider, Provider};
///
/// #[derive(Debug, Default, Configurable)]
/// struct Server {
///     #[config(env = "DOC_SERVER_HOST", default = "localhost")]
///     pub host: String,
///     #[config(default = 8080)]
///     pub port: u16,
/// }
///
/// let mut server = Server::default();
/// let providers: Vec<Box<dyn Provider>> =
///     vec![Box::new(EnvProvider::new()), Box::new(DefaultProvider::new())];
/// Configurator::new(&mut server, providers).run().unwrap();
///
/// assert_eq!(server.port, 8080);
/// ```
///
/// Only [`Configurable`] types can be targets:
/// ```compile_fail
/// use config_chain::{Configurator, DefaultProvider};
///
/// let mut port: u16 = 0;
/// Configurator::new(&mut port, Vec::new())
///     .with_provider(DefaultProvider::new())
///     .run()
///     .unwrap();
/// ```
pub struct Configurator<'a, T: Configurable> {
    target: &'a mut T,
    providers: Vec<Box<dyn Provider + 'a>>,
    on_error: Option<ErrorHandler<'a>>,
    logging: bool,
}

impl<'a, T: Configurable> Configurator<'a, T> {
    /// Create a configurator for `target`; `providers` run in the given order
    pub fn new(target: &'a mut T, providers: Vec<Box<dyn Provider + 'a>>) -> Self {
        Self {
            target,
            providers,
            on_error: None,
            logging: false,
        }
    }

    /// Append a provider to the end of the chain
    pub fn with_provider(mut self, provider: impl Provider + 'a) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Replace the default error handler (panic) for unresolved and invalid fields
    ///
    /// If the handler returns, the pass continues with the next field and the failed
    /// field keeps whatever value it had.
    pub fn on_error(mut self, handler: impl FnMut(ConfigError) + 'a) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    /// Emit `tracing` events while resolving
    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Run one resolution pass
    ///
    /// Precondition and provider setup failures are returned before any field is
    /// touched. Field failures go to the error handler.
    pub fn run(self) -> Result<(), ConfigError> {
        let Self {
            target,
            mut providers,
            on_error,
            logging,
        } = self;

        init_providers::<T>(&mut providers, logging)?;

        let mut on_error: ErrorHandler<'a> = match on_error {
            Some(handler) => handler,
            None => Box::new(halt),
        };
        Resolver::new(&providers, &mut *on_error, logging).resolve(target);

        if logging {
            tracing::info!(providers = providers.len(), "configuration resolved");
        }
        Ok(())
    }

    /// Run one resolution pass, collecting every field failure instead of halting
    ///
    /// Any handler set with [`Configurator::on_error`] is ignored.
    pub fn run_collecting(self) -> Result<(), Vec<ConfigError>> {
        let Self {
            target,
            mut providers,
            logging,
            ..
        } = self;

        init_providers::<T>(&mut providers, logging).map_err(|e| vec![e])?;

        let mut errors = Vec::new();
        let mut collect = |err: ConfigError| errors.push(err);
        Resolver::new(&providers, &mut collect, logging).resolve(target);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Check the chain and run every provider's one-time setup, in order
fn init_providers<T: Configurable>(
    providers: &mut [Box<dyn Provider + '_>],
    logging: bool,
) -> Result<(), ConfigError> {
    if providers.is_empty() {
        return Err(ConfigError::NoProviders);
    }

    let mut fields = Vec::new();
    T::describe(&mut fields);

    let mut registered = HashSet::new();
    for provider in providers.iter_mut() {
        let name = provider.name().to_string();
        if !registered.insert(name.clone()) {
            return Err(ConfigError::ProviderNameCollision { name });
        }

        provider
            .init(&fields)
            .map_err(|err| ConfigError::ProviderInit {
                provider: name.clone(),
                reason: err.to_string(),
            })?;

        if logging {
            tracing::debug!(provider = %name, "provider initialised");
        }
    }

    Ok(())
}

/// Default error handler: stop the pass and the thread running it
fn halt(err: ConfigError) {
    panic!("{}", format_config_errors(std::slice::from_ref(&err)));
}

/// Populate `target` from environment variables, then `default` tags
pub fn from_env_and_default<T: Configurable>(target: &mut T) -> Result<(), ConfigError> {
    Configurator::new(target, Vec::new())
        .with_provider(EnvProvider::new())
        .with_provider(DefaultProvider::new())
        .run()
}
