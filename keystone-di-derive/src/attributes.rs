use syn::{Attribute, Error, ExprArray, LitStr};

pub struct ProviderAttributes {
    pub name: Option<LitStr>,
    pub requires: Option<ExprArray>,
    pub providers: Option<ExprArray>,
    pub is_core: bool,
}

impl TryFrom<&Attribute> for ProviderAttributes {
    type Error = Error;

    fn try_from(value: &Attribute) -> Result<Self, Self::Error> {
        let mut name = None;
        let mut requires = None;
        let mut providers = None;
        let mut is_core = false;

        value.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value().and_then(|value| value.parse())?);
            } else if meta.path.is_ident("requires") {
                requires = Some(meta.value().and_then(|value| value.parse())?);
            } else if meta.path.is_ident("providers") {
                providers = Some(meta.value().and_then(|value| value.parse())?);
            } else if meta.path.is_ident("core") {
                is_core = true;
            } else {
                return Err(meta.error("Unsupported provider attribute!"));
            }

            Ok(())
        })?;

        Ok(Self {
            name,
            requires,
            providers,
            is_core,
        })
    }
}
