//! `#[derive(Schema)]` for flatconf configuration structs.
//!
//! The derive emits a static field table (identifier, annotations, embedded
//! flag, shape) plus `Node`/`Record` impls handing out disjoint mutable views
//! of every public field.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Token, Visibility};

#[proc_macro_derive(Schema, attributes(config))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Schema cannot be derived for generic structs",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Schema can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Schema requires a struct with named fields",
        ));
    };

    let rule = container_rule(input)?;
    let mut defs = Vec::new();
    let mut nodes = Vec::new();

    for field in &named.named {
        let Some(member) = &field.ident else {
            continue;
        };
        let attrs = FieldAttrs::parse(field, rule)?;
        if attrs.skip || !matches!(field.vis, Visibility::Public(_)) {
            continue;
        }

        let ident = member.unraw().to_string();
        let ty = &field.ty;
        let embedded = attrs.embedded;
        let tags = attrs.tags.iter().map(|(key, value)| quote!((#key, #value)));

        defs.push(quote! {
            ::flatconf::FieldDef {
                ident: #ident,
                tags: &[#(#tags),*],
                embedded: #embedded,
                shape: <#ty as ::flatconf::Node>::shape,
            }
        });
        nodes.push(quote! { ::flatconf::Node::node(&mut self.#member) });
    }

    let name = &input.ident;
    Ok(quote! {
        const _: () = {
            const FIELDS: &[::flatconf::FieldDef] = &[#(#defs),*];

            impl ::flatconf::Node for #name {
                fn shape() -> ::flatconf::Shape {
                    ::flatconf::Shape::Record(FIELDS)
                }

                fn node(&mut self) -> ::flatconf::NodeMut<'_> {
                    ::flatconf::NodeMut::Record(self)
                }
            }

            impl ::flatconf::Record for #name {
                fn fields(&self) -> &'static [::flatconf::FieldDef] {
                    FIELDS
                }

                fn nodes(&mut self) -> ::std::vec::Vec<::flatconf::NodeMut<'_>> {
                    ::std::vec![#(#nodes),*]
                }
            }
        };
    })
}

/// serde `rename_all` rules, applied to field identifiers the way serde does.
#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_lit(lit: &LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            other => {
                return Err(syn::Error::new_spanned(
                    lit,
                    format!("unknown rename rule `{other}`"),
                ))
            }
        })
    }

    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => {
                let mut pascal = String::new();
                let mut capitalize = true;
                for c in field.chars() {
                    if c == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(c.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(c);
                    }
                }
                pascal
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => Self::ScreamingSnake.apply(field).replace('_', "-"),
        }
    }
}

/// The `rename_all` (or `rename_all(deserialize = ..)`) rule on the container.
fn container_rule(input: &DeriveInput) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("rename_all") {
                return skip_value(&meta);
            }
            if meta.input.peek(Token![=]) {
                rule = Some(RenameRule::from_lit(&meta.value()?.parse::<LitStr>()?)?);
                return Ok(());
            }
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("deserialize") {
                    rule = Some(RenameRule::from_lit(&inner.value()?.parse::<LitStr>()?)?);
                    Ok(())
                } else {
                    skip_value(&inner)
                }
            })
        })?;
    }
    Ok(rule)
}

/// Annotations collected from `#[config(...)]` and the serde attributes we mirror.
#[derive(Default)]
struct FieldAttrs {
    tags: Vec<(String, String)>,
    embedded: bool,
    skip: bool,
}

impl FieldAttrs {
    fn parse(field: &syn::Field, rule: Option<RenameRule>) -> syn::Result<Self> {
        let mut attrs = FieldAttrs::default();
        let mut serde_tag = None;
        let mut aliases = Vec::new();

        for attr in &field.attrs {
            if attr.path().is_ident("config") {
                attr.parse_nested_meta(|meta| {
                    let key = meta
                        .path
                        .get_ident()
                        .map(|ident| ident.unraw().to_string())
                        .ok_or_else(|| meta.error("expected an annotation name"))?;

                    match key.as_str() {
                        "embed" | "flatten" => attrs.embedded = true,
                        "skip" => attrs.skip = true,
                        "yaml" | "json" | "toml" | "serde" | "rename" => {
                            return Err(meta.error(
                                "file keys follow serde; use #[serde(rename = \"...\")]",
                            ))
                        }
                        "alias" => {
                            return Err(meta.error("use #[serde(alias = \"...\")]"))
                        }
                        _ => {
                            let value = if meta.input.peek(Token![=]) {
                                meta.value()?.parse::<LitStr>()?.value()
                            } else {
                                String::new()
                            };
                            attrs.tags.push((key, value));
                        }
                    }
                    Ok(())
                })?;
            } else if attr.path().is_ident("serde") {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        if meta.input.peek(Token![=]) {
                            serde_tag = Some(meta.value()?.parse::<LitStr>()?.value());
                        } else {
                            meta.parse_nested_meta(|inner| {
                                if inner.path.is_ident("deserialize") {
                                    serde_tag = Some(inner.value()?.parse::<LitStr>()?.value());
                                    Ok(())
                                } else {
                                    skip_value(&inner)
                                }
                            })?;
                        }
                    } else if meta.path.is_ident("alias") {
                        aliases.push(meta.value()?.parse::<LitStr>()?.value());
                    } else if meta.path.is_ident("flatten") {
                        attrs.embedded = true;
                    } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing")
                    {
                        serde_tag = Some("-".to_string());
                    } else {
                        skip_value(&meta)?;
                    }
                    Ok(())
                })?;
            }
        }

        let serde_tag = serde_tag.or_else(|| {
            let ident = field.ident.as_ref()?.unraw().to_string();
            rule.map(|rule| rule.apply(&ident))
        });
        if let Some(value) = serde_tag {
            attrs.tags.push(("serde".to_string(), value));
        }
        attrs
            .tags
            .extend(aliases.into_iter().map(|alias| ("alias".to_string(), alias)));
        Ok(attrs)
    }
}

fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }
    Ok(())
}
