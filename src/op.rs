use serde::{Deserialize, Serialize};

/// The change a plan settled on, carried to apply as the plan's private data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderOp {
    Create,
    Update { changed: Vec<String> },
    Replace { attributes: Vec<String> },
    Delete,
    NoOp,
}

impl ProviderOp {
    pub fn to_string(&self) -> Result<String, anyhow::Error> {
        Ok(ron::to_string(self)?)
    }

    pub fn from_str(s: &str) -> Result<Self, anyhow::Error>
    where
        Self: Sized,
    {
        Ok(ron::from_str(s)?)
    }

    /// The op implied by which of prior and planned state exist, used when a
    /// caller applies without passing the plan's private data back.
    pub fn infer(has_prior: bool, has_planned: bool) -> Self {
        match (has_prior, has_planned) {
            (false, false) => ProviderOp::NoOp,
            (false, true) => ProviderOp::Create,
            (true, false) => ProviderOp::Delete,
            (true, true) => ProviderOp::Update { changed: Vec::new() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_survive_ron() {
        let op = ProviderOp::Replace {
            attributes: vec!["branch".into(), "source_sha".into()],
        };
        let s = op.to_string().unwrap();
        assert!(s.starts_with("Replace"));
        assert_eq!(ProviderOp::from_str(&s).unwrap(), op);
    }

    #[test]
    fn infer_from_presence() {
        assert_eq!(ProviderOp::infer(false, true), ProviderOp::Create);
        assert_eq!(ProviderOp::infer(true, false), ProviderOp::Delete);
        assert_eq!(ProviderOp::infer(false, false), ProviderOp::NoOp);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ProviderOp::from_str("Explode").is_err());
    }
}
