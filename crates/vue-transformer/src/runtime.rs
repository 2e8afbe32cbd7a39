//! The shared runtime helper module.
//!
//! Generated components call into a handful of helpers instead of inlining
//! the same adapters into every file. The module is emitted at most once
//! per run, and only when some component referenced one of its exports.

/// Helper names, as referenced from generated code and imported from the
/// runtime module.
pub mod helper {
    pub const MAKE_WATCHER: &str = "makeWatcher";
    pub const MAKE_CLASS_NAME: &str = "makeClassName";
    pub const MAKE_STYLE: &str = "makeStyle";
    pub const UNWRAP_EVENT: &str = "unwrapEvent";
    pub const NEXT_TICK: &str = "nextTick$";
}

/// Source of the runtime module.
pub const RUNTIME_SOURCE: &str = r#"import { tick } from 'svelte';

export const makeWatcher = (fn, immediate) => {
  let oldValue;
  let ready = Boolean(immediate);
  return newValue => {
    if (ready) {
      fn(newValue, oldValue);
    }
    ready = true;
    oldValue = newValue;
  };
};

export const makeClassName = value => {
  if (Array.isArray(value)) {
    return value.map(makeClassName).filter(Boolean).join(' ');
  }
  if (value && typeof value === 'object') {
    return Object.keys(value)
      .filter(key => value[key])
      .join(' ');
  }
  return value || '';
};

const toKebab = key => key.replace(/[A-Z]/g, c => '-' + c.toLowerCase());

export const makeStyle = value => {
  if (value && typeof value === 'object') {
    return Object.keys(value)
      .map(key => toKebab(key) + ': ' + value[key])
      .join('; ');
  }
  return value || '';
};

export const unwrapEvent = event =>
  event instanceof CustomEvent ? event.detail : event;

export const nextTick$ = fn => tick().then(fn);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_every_helper() {
        for name in [
            helper::MAKE_WATCHER,
            helper::MAKE_CLASS_NAME,
            helper::MAKE_STYLE,
            helper::UNWRAP_EVENT,
            helper::NEXT_TICK,
        ] {
            assert!(
                RUNTIME_SOURCE.contains(&format!("export const {}", name)),
                "runtime module is missing {}",
                name
            );
        }
    }

    #[test]
    fn class_helper_filters_by_truthiness_and_joins_with_spaces() {
        assert!(RUNTIME_SOURCE.contains("filter(key => value[key])"));
        assert!(RUNTIME_SOURCE.contains(".join(' ')"));
    }

    #[test]
    fn style_helper_hyphenates_and_joins_declarations() {
        assert!(RUNTIME_SOURCE.contains("'-' + c.toLowerCase()"));
        assert!(RUNTIME_SOURCE.contains("toKebab(key) + ': ' + value[key]"));
        assert!(RUNTIME_SOURCE.contains(".join('; ')"));
    }

    #[test]
    fn watcher_suppresses_the_first_call_unless_immediate() {
        assert!(RUNTIME_SOURCE.contains("let ready = Boolean(immediate);"));
        assert!(RUNTIME_SOURCE.contains("if (ready)"));
    }
}
