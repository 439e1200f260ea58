use crate::Configurable;
use crate::error::ConfigError;
use crate::field::{Field, FieldDescriptor};
use crate::provider::{Provided, Provider};
use crate::setter::FieldSlot;

/// Walks a configuration struct and routes every public leaf through the provider chain
pub(crate) struct Resolver<'r, 'p> {
    providers: &'r [Box<dyn Provider + 'p>],
    on_error: &'r mut dyn FnMut(ConfigError),
    logging: bool,
}

impl<'r, 'p> Resolver<'r, 'p> {
    pub(crate) fn new(
        providers: &'r [Box<dyn Provider + 'p>],
        on_error: &'r mut dyn FnMut(ConfigError),
        logging: bool,
    ) -> Self {
        Self {
            providers,
            on_error,
            logging,
        }
    }

    /// Visit the fields of `target` in declaration order, expanding nested structs inline
    pub(crate) fn resolve(&mut self, target: &mut dyn Configurable) {
        for field in target.fields() {
            match field {
                Field::Nested { name, target } => {
                    if self.logging {
                        tracing::trace!(field = name, "descending into nested struct");
                    }
                    self.resolve(target);
                }
                Field::OptionalNested { name, slot } => {
                    if self.logging && !slot.is_allocated() {
                        tracing::trace!(field = name, "allocating nested struct");
                    }
                    self.resolve(slot.allocate());
                }
                Field::Private { name } => {
                    if self.logging {
                        tracing::trace!(field = name, "skipping private field");
                    }
                }
                Field::Leaf { descriptor, slot } => self.apply_providers(&descriptor, slot),
            }
        }
    }

    fn apply_providers(&mut self, field: &FieldDescriptor, slot: &mut dyn FieldSlot) {
        for provider in self.providers {
            match provider.provide(field, &mut *slot) {
                Ok(Provided::Applied) => {
                    if self.logging {
                        tracing::debug!(
                            field = field.name,
                            provider = provider.name(),
                            "field resolved"
                        );
                    }
                    return;
                }
                Ok(Provided::NotApplicable) => continue,
                Err(err) => {
                    if self.logging {
                        tracing::warn!(
                            field = field.name,
                            provider = provider.name(),
                            "provider rejected field"
                        );
                    }
                    (self.on_error)(err);
                    return;
                }
            }
        }

        if self.logging {
            tracing::warn!(field = field.name, "no provider could set field");
        }
        (self.on_error)(ConfigError::Unresolved {
            field: field.name.to_string(),
            tags: field.tags_display(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultProvider;
    use std::collections::HashMap;
    use tracing_test::traced_test;

    #[derive(Debug, Default, Configurable)]
    struct Inner {
        #[config(default = "inner")]
        pub label: String,
    }

    #[derive(Debug, Default, Configurable)]
    struct Outer {
        #[config(default = 1)]
        pub first: u8,
        #[config(nested)]
        pub inner: Inner,
        #[config(nested)]
        pub lazy: Option<Inner>,
        #[config(default = 2)]
        pub last: u8,
        hidden: u8,
    }

    /// Claims exactly the fields it was given values for
    struct Recorder {
        name: &'static str,
        values: HashMap<&'static str, &'static str>,
    }

    impl Recorder {
        fn new(name: &'static str, values: &[(&'static str, &'static str)]) -> Self {
            Self {
                name,
                values: values.iter().copied().collect(),
            }
        }
    }

    impl Provider for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn provide(
            &self,
            field: &FieldDescriptor,
            slot: &mut dyn FieldSlot,
        ) -> Result<Provided, ConfigError> {
            match self.values.get(field.name) {
                Some(raw) => {
                    crate::set_field(field, slot, raw)?;
                    Ok(Provided::Applied)
                }
                None => Ok(Provided::NotApplicable),
            }
        }
    }

    #[test]
    fn test_visits_in_declaration_order_depth_first() {
        let providers: Vec<Box<dyn Provider>> =
            vec![Box::new(Recorder::new("recorder", &[])), Box::new(DefaultProvider::new())];
        let mut errors: Vec<ConfigError> = Vec::new();
        let mut collect = |err: ConfigError| errors.push(err);
        let mut outer = Outer::default();

        Resolver::new(&providers, &mut collect, false).resolve(&mut outer);

        assert!(errors.is_empty());
        assert_eq!(outer.first, 1);
        assert_eq!(outer.inner.label, "inner");
        assert_eq!(outer.lazy.as_ref().map(|i| i.label.as_str()), Some("inner"));
        assert_eq!(outer.last, 2);
        assert_eq!(outer.hidden, 0);
    }

    #[test]
    fn test_unclaimed_leaves_reported_once_each() {
        let mut errors: Vec<ConfigError> = Vec::new();
        let mut outer = Outer::default();

        let providers: Vec<Box<dyn Provider>> = vec![Box::new(Recorder::new("recorder", &[]))];
        let mut collect = |err: ConfigError| errors.push(err);
        Resolver::new(&providers, &mut collect, false).resolve(&mut outer);

        // nothing claims anything: every public leaf is reported exactly once
        let reported: Vec<String> = errors
            .iter()
            .filter_map(|e| e.field().map(str::to_string))
            .collect();
        assert_eq!(reported, vec!["first", "label", "label", "last"]);
        assert!(!reported.contains(&"hidden".to_string()));
    }

    #[test]
    fn test_first_claim_wins() {
        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(Recorder::new("early", &[("first", "10")])),
            Box::new(Recorder::new("late", &[("first", "20"), ("last", "30")])),
            Box::new(DefaultProvider::new()),
        ];
        let mut errors: Vec<ConfigError> = Vec::new();
        let mut collect = |err: ConfigError| errors.push(err);
        let mut outer = Outer::default();

        Resolver::new(&providers, &mut collect, false).resolve(&mut outer);

        assert!(errors.is_empty());
        assert_eq!(outer.first, 10);
        assert_eq!(outer.last, 30);
    }

    #[test]
    fn test_hard_failure_stops_chain_for_field() {
        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(Recorder::new("broken", &[("first", "not-a-number")])),
            Box::new(DefaultProvider::new()),
        ];
        let mut errors: Vec<ConfigError> = Vec::new();
        let mut collect = |err: ConfigError| errors.push(err);
        let mut outer = Outer::default();

        Resolver::new(&providers, &mut collect, false).resolve(&mut outer);

        // the default of 1 must not be used as a silent fallback
        assert_eq!(outer.first, 0);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigError::Conversion { field, value, .. } if field == "first" && value == "not-a-number"
        ));
        assert_eq!(outer.last, 2);
    }

    #[test]
    #[traced_test]
    fn test_logging_reports_winning_provider() {
        let providers: Vec<Box<dyn Provider>> = vec![Box::new(DefaultProvider::new())];
        let mut collect = |_err: ConfigError| {};
        let mut outer = Outer::default();

        Resolver::new(&providers, &mut collect, true).resolve(&mut outer);

        assert!(logs_contain("field resolved"));
        assert!(logs_contain("DefaultProvider"));
        assert!(logs_contain("allocating nested struct"));
        assert!(logs_contain("skipping private field"));
    }

    #[test]
    #[traced_test]
    fn test_logging_disabled_is_silent() {
        let providers: Vec<Box<dyn Provider>> = vec![Box::new(DefaultProvider::new())];
        let mut collect = |_err: ConfigError| {};
        let mut outer = Outer::default();

        Resolver::new(&providers, &mut collect, false).resolve(&mut outer);

        assert!(!logs_contain("field resolved"));
    }
}
