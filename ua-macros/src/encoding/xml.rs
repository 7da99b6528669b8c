// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use super::{attribute::EncodingItemAttribute, enums::SimpleEnum, EncodingStruct};

fn field_tag(ident: &Ident, rename: &Option<String>) -> String {
    rename
        .clone()
        .unwrap_or_else(|| ident.to_string().to_case(Case::Pascal))
}

pub fn generate_xml_encode_impl(strct: EncodingStruct) -> syn::Result<TokenStream> {
    let ident = strct.ident;
    let mut body = quote! {};
    for field in strct.fields {
        if field.attr.ignore {
            continue;
        }
        let name = field_tag(&field.ident, &field.attr.rename);
        let ident = field.ident;
        if field.attr.optional {
            body.extend(quote! {
                if let Some(item) = &self.#ident {
                    stream.encode_child(#name, item, ctx)?;
                }
            });
        } else {
            body.extend(quote! {
                stream.encode_child(#name, &self.#ident, ctx)?;
            });
        }
    }

    Ok(quote! {
        impl ua_types::xml::XmlEncodable for #ident {
            fn encode(
                &self,
                stream: &mut ua_types::xml::XmlStreamWriter<&mut dyn std::io::Write>,
                ctx: &ua_types::Context<'_>,
            ) -> ua_types::EncodingResult<()> {
                use ua_types::xml::XmlWriteExt;
                #body
                Ok(())
            }
        }
    })
}

pub fn generate_xml_decode_impl(strct: EncodingStruct) -> syn::Result<TokenStream> {
    let ident = strct.ident;
    let mut declare = quote! {};
    let mut arms = quote! {};
    let mut build = quote! {};

    for field in strct.fields {
        let fident = field.ident.clone();
        if field.attr.ignore {
            build.extend(quote! {
                #fident: Default::default(),
            });
            continue;
        }
        let name = field_tag(&field.ident, &field.attr.rename);
        let typ = field.typ;
        declare.extend(quote! {
            let mut #fident: Option<#typ> = None;
        });
        arms.extend(quote! {
            #name => {
                #fident = Some(ua_types::xml::XmlDecodable::decode(stream, ctx)?);
            }
        });
        build.extend(quote! {
            #fident: #fident.unwrap_or_default(),
        });
    }

    Ok(quote! {
        impl ua_types::xml::XmlDecodable for #ident {
            fn decode(
                stream: &mut ua_types::xml::XmlStreamReader<&mut dyn std::io::Read>,
                ctx: &ua_types::Context<'_>,
            ) -> ua_types::EncodingResult<Self> {
                use ua_types::xml::XmlReadExt;
                #declare
                stream.iter_children(
                    |__key, stream, ctx| {
                        match __key.as_str() {
                            #arms
                            _ => {
                                stream.skip_value()?;
                            }
                        }
                        Ok(())
                    },
                    ctx,
                )?;
                Ok(Self {
                    #build
                })
            }
        }
    })
}

pub fn generate_simple_enum_xml_encode_impl(en: SimpleEnum) -> syn::Result<TokenStream> {
    let ident = en.ident;

    Ok(quote! {
        impl ua_types::xml::XmlEncodable for #ident {
            fn encode(
                &self,
                stream: &mut ua_types::xml::XmlStreamWriter<&mut dyn std::io::Write>,
                _ctx: &ua_types::Context<'_>,
            ) -> ua_types::EncodingResult<()> {
                stream.write_text(ua_types::UaEnum::as_str(self))?;
                Ok(())
            }
        }
    })
}

pub fn generate_simple_enum_xml_decode_impl(en: SimpleEnum) -> syn::Result<TokenStream> {
    let ident = en.ident;

    Ok(quote! {
        impl ua_types::xml::XmlDecodable for #ident {
            fn decode(
                stream: &mut ua_types::xml::XmlStreamReader<&mut dyn std::io::Read>,
                _ctx: &ua_types::Context<'_>,
            ) -> ua_types::EncodingResult<Self> {
                let val = stream.consume_as_text()?;
                <Self as ua_types::UaEnum>::from_str(&val)
            }
        }
    })
}

pub fn generate_xml_type_impl(
    ident: Ident,
    attr: EncodingItemAttribute,
) -> syn::Result<TokenStream> {
    let name = attr.rename.unwrap_or_else(|| ident.to_string());
    Ok(quote! {
        impl ua_types::xml::XmlType for #ident {
            const TAG: &'static str = #name;
        }
    })
}
