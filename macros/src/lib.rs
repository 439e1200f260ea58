use proc_macro::TokenStream;
use quote::quote;
use std::collections::BTreeMap;
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DeriveInput, Expr, Fields, Lit, Meta, Token, Type, UnOp, Visibility,
    parse_macro_input,
};

/// Helper enum for parsed attribute values
enum MetaValue {
    Str(String),
    Flag,
}

/// Derive the field descriptors a resolution pass walks over.
///
/// Every `#[config(key = value)]` pair becomes a tag on the field's descriptor. The
/// `nested` flag marks a struct-typed field (either `T` or `Option<T>`) that is walked
/// recursively instead of being handed to providers.
#[proc_macro_derive(Configurable, attributes(config))]
pub fn derive_configurable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_configurable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_configurable(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => {
                return Ok(empty_impl(input));
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Configurable can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Configurable can only be derived for structs",
            ));
        }
    };

    let mut field_entries = Vec::new();
    let mut describe_entries = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let field_name = field_ident.unraw().to_string();
        let field_type = &field.ty;
        let config = parse_field_config(&field.attrs)?;

        // Keep cfg gates so feature-dependent fields disappear from the descriptors too
        let cfg_attrs: Vec<&Attribute> = field
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("cfg"))
            .collect();

        if config.nested {
            if !config.tags.is_empty() {
                return Err(syn::Error::new_spanned(
                    field,
                    "nested fields cannot carry tags, tag the fields of the nested struct instead",
                ));
            }

            let (is_option, inner_type) = extract_option_type(field_type);
            if is_option {
                field_entries.push(quote! {
                    #(#cfg_attrs)*
                    fields.push(::config_chain::Field::OptionalNested {
                        name: #field_name,
                        slot: &mut self.#field_ident,
                    });
                });
            } else {
                field_entries.push(quote! {
                    #(#cfg_attrs)*
                    fields.push(::config_chain::Field::Nested {
                        name: #field_name,
                        target: &mut self.#field_ident,
                    });
                });
            }
            describe_entries.push(quote! {
                #(#cfg_attrs)*
                <#inner_type as ::config_chain::Configurable>::describe(out);
            });
            continue;
        }

        if !matches!(field.vis, Visibility::Public(_)) {
            field_entries.push(quote! {
                #(#cfg_attrs)*
                fields.push(::config_chain::Field::Private { name: #field_name });
            });
            continue;
        }

        let type_name = quote!(#field_type).to_string().replace(' ', "");
        let tags = config.tags.iter().map(|(key, value)| quote!((#key, #value)));
        let descriptor = quote! {
            ::config_chain::FieldDescriptor {
                name: #field_name,
                type_name: #type_name,
                kind: <#field_type as ::config_chain::FieldType>::KIND,
                tags: &[#(#tags),*],
            }
        };

        field_entries.push(quote! {
            #(#cfg_attrs)*
            fields.push(::config_chain::Field::Leaf {
                descriptor: #descriptor,
                slot: &mut self.#field_ident,
            });
        });
        describe_entries.push(quote! {
            #(#cfg_attrs)*
            out.push(#descriptor);
        });
    }

    Ok(quote! {
        impl #impl_generics ::config_chain::Configurable for #struct_name #ty_generics #where_clause {
            fn fields(&mut self) -> ::std::vec::Vec<::config_chain::Field<'_>> {
                #[allow(unused_mut)]
                let mut fields = ::std::vec::Vec::new();

                #(#field_entries)*

                fields
            }

            #[allow(unused_variables)]
            fn describe(out: &mut ::std::vec::Vec<::config_chain::FieldDescriptor>) {
                #(#describe_entries)*
            }
        }
    })
}

fn empty_impl(input: &DeriveInput) -> proc_macro2::TokenStream {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::config_chain::Configurable for #struct_name #ty_generics #where_clause {
            fn fields(&mut self) -> ::std::vec::Vec<::config_chain::Field<'_>> {
                ::std::vec::Vec::new()
            }

            fn describe(_out: &mut ::std::vec::Vec<::config_chain::FieldDescriptor>) {}
        }
    }
}

#[derive(Debug, Default)]
struct FieldConfig {
    nested: bool,
    // Sorted by key so descriptors render the same way on every build
    tags: BTreeMap<String, String>,
}

/// Parse #[config(env = "X", default = 8080, nested)] syntax
fn parse_config_list(meta_list: &syn::MetaList) -> syn::Result<Vec<(String, MetaValue)>> {
    let mut values = Vec::new();

    meta_list.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .ok_or_else(|| meta.error("expected identifier"))?
            .unraw()
            .to_string();

        if meta.input.peek(Token![=]) {
            meta.input.parse::<Token![=]>()?;
            let expr: Expr = meta.input.parse()?;
            values.push((key, MetaValue::Str(literal_to_string(&expr)?)));
        } else {
            values.push((key, MetaValue::Flag));
        }

        Ok(())
    })?;

    Ok(values)
}

fn parse_field_config(attrs: &[Attribute]) -> syn::Result<FieldConfig> {
    let mut config = FieldConfig::default();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("config")) {
        let parsed = match &attr.meta {
            Meta::List(list) => parse_config_list(list)?,
            _ => {
                return Err(syn::Error::new_spanned(
                    attr,
                    "config attribute must be a list: #[config(env = \"...\", ...)]",
                ));
            }
        };

        for (key, value) in parsed {
            match value {
                MetaValue::Flag if key == "nested" => config.nested = true,
                MetaValue::Flag => {
                    return Err(syn::Error::new_spanned(
                        attr,
                        format!("tag `{}` needs a value: {} = \"...\"", key, key),
                    ));
                }
                MetaValue::Str(_) if key == "nested" => {
                    return Err(syn::Error::new_spanned(
                        attr,
                        "`nested` is a flag and takes no value",
                    ));
                }
                MetaValue::Str(value) => {
                    if config.tags.insert(key.clone(), value).is_some() {
                        return Err(syn::Error::new_spanned(
                            attr,
                            format!("tag `{}` is declared more than once", key),
                        ));
                    }
                }
            }
        }
    }

    Ok(config)
}

/// Turn a literal (optionally negated) into the raw text a provider will parse
fn literal_to_string(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => Ok(s.value()),
            Lit::Int(i) => Ok(i.base10_digits().to_string()),
            Lit::Float(f) => Ok(f.base10_digits().to_string()),
            Lit::Bool(b) => Ok(b.value.to_string()),
            Lit::Char(c) => Ok(c.value().to_string()),
            other => Err(syn::Error::new_spanned(
                other,
                "tag values must be string, integer, float, bool or char literals",
            )),
        },
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => {
            Ok(format!("-{}", literal_to_string(&unary.expr)?))
        }
        Expr::Group(group) => literal_to_string(&group.expr),
        other => Err(syn::Error::new_spanned(
            other,
            "tag values must be literals",
        )),
    }
}

/// Extract the inner type from Option<T>, returns (is_option, inner_type)
fn extract_option_type(ty: &Type) -> (bool, &Type) {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" {
                if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first() {
                        return (true, inner_ty);
                    }
                }
            }
        }
    }
    (false, ty)
}
