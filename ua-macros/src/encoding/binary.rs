// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0

use proc_macro2::TokenStream;
use quote::quote;

use super::{enums::SimpleEnum, EncodingStruct};

pub fn generate_binary_encode_impl(strct: EncodingStruct) -> syn::Result<TokenStream> {
    let mut byte_len_body = quote! {};
    let mut encode_body = quote! {};

    let any_optional = strct
        .fields
        .iter()
        .any(|f| f.attr.optional && !f.attr.ignore);

    if any_optional {
        let mut optional_index = 0u32;

        // The 32-bit encoding mask precedes all fields.
        byte_len_body.extend(quote! {
            size += 4;
        });
        encode_body.extend(quote! {
            let mut encoding_mask = 0u32;
        });
        for field in &strct.fields {
            if !field.attr.optional || field.attr.ignore {
                continue;
            }
            let ident = &field.ident;
            encode_body.extend(quote! {
                if self.#ident.is_some() {
                    encoding_mask |= 1 << #optional_index;
                }
            });
            optional_index += 1;
        }
        if optional_index > 32 {
            return Err(syn::Error::new_spanned(
                strct.ident,
                "At most 32 optional fields are supported",
            ));
        }
        encode_body.extend(quote! {
            ua_types::write_u32(stream, encoding_mask)?;
        });
    }

    for field in strct.fields {
        if field.attr.ignore {
            continue;
        }

        let ident = field.ident;
        if field.attr.optional {
            byte_len_body.extend(quote! {
                if let Some(item) = &self.#ident {
                    size += ua_types::BinaryEncodable::byte_len(item, ctx);
                }
            });
            encode_body.extend(quote! {
                if let Some(item) = &self.#ident {
                    ua_types::BinaryEncodable::encode(item, stream, ctx)?;
                }
            });
        } else {
            byte_len_body.extend(quote! {
                size += ua_types::BinaryEncodable::byte_len(&self.#ident, ctx);
            });
            encode_body.extend(quote! {
                ua_types::BinaryEncodable::encode(&self.#ident, stream, ctx)?;
            });
        }
    }
    let ident = strct.ident;

    Ok(quote! {
        impl ua_types::BinaryEncodable for #ident {
            #[allow(unused)]
            fn byte_len(&self, ctx: &ua_types::Context<'_>) -> usize {
                let mut size = 0usize;
                #byte_len_body
                size
            }
            #[allow(unused)]
            fn encode<S: std::io::Write + ?Sized>(
                &self,
                stream: &mut S,
                ctx: &ua_types::Context<'_>,
            ) -> ua_types::EncodingResult<()> {
                #encode_body
                Ok(())
            }
        }
    })
}

pub fn generate_binary_decode_impl(strct: EncodingStruct) -> syn::Result<TokenStream> {
    let mut decode_impl = quote! {};
    let mut decode_build = quote! {};

    let mut has_context = false;
    let any_optional = strct
        .fields
        .iter()
        .any(|f| f.attr.optional && !f.attr.ignore);

    if any_optional {
        decode_impl.extend(quote! {
            let encoding_mask = ua_types::read_u32(stream)?;
        });
    }

    let mut optional_idx = 0u32;
    for field in strct.fields {
        let ident = field.ident;
        if field.attr.ignore {
            decode_build.extend(quote! {
                #ident: Default::default(),
            });
            continue;
        }

        // Errors after the header carry the request handle, so that a service fault
        // can be matched to its request.
        let ident_string = ident.to_string();
        let inner = if ident_string == "request_header" {
            decode_impl.extend(quote! {
                let request_header: ua_types::RequestHeader = ua_types::BinaryDecodable::decode(stream, ctx)?;
                let __request_handle = request_header.request_handle;
            });
            decode_build.extend(quote! {
                request_header,
            });
            has_context = true;
            continue;
        } else if ident_string == "response_header" {
            decode_impl.extend(quote! {
                let response_header: ua_types::ResponseHeader = ua_types::BinaryDecodable::decode(stream, ctx)?;
                let __request_handle = response_header.request_handle;
            });
            decode_build.extend(quote! {
                response_header,
            });
            has_context = true;
            continue;
        } else if has_context {
            quote! {
                ua_types::BinaryDecodable::decode(stream, ctx)
                    .map_err(|e: ua_types::Error| e.with_request_handle(__request_handle))?
            }
        } else {
            quote! {
                ua_types::BinaryDecodable::decode(stream, ctx)?
            }
        };

        if field.attr.optional {
            decode_build.extend(quote! {
                #ident: if (encoding_mask & (1 << #optional_idx)) != 0 {
                    Some(#inner)
                } else {
                    None
                },
            });
            optional_idx += 1;
        } else {
            decode_build.extend(quote! {
                #ident: #inner,
            });
        }
    }

    let ident = strct.ident;

    Ok(quote! {
        impl ua_types::BinaryDecodable for #ident {
            #[allow(unused_variables)]
            fn decode<S: std::io::Read + ?Sized>(stream: &mut S, ctx: &ua_types::Context<'_>) -> ua_types::EncodingResult<Self> {
                #decode_impl
                Ok(Self {
                    #decode_build
                })
            }
        }
    })
}

pub fn generate_simple_enum_binary_decode_impl(en: SimpleEnum) -> syn::Result<TokenStream> {
    let ident = en.ident;
    let repr = en.repr;

    Ok(quote! {
        impl ua_types::BinaryDecodable for #ident {
            #[allow(unused_variables)]
            fn decode<S: std::io::Read + ?Sized>(stream: &mut S, ctx: &ua_types::Context<'_>) -> ua_types::EncodingResult<Self> {
                let val = <#repr as ua_types::BinaryDecodable>::decode(stream, ctx)?;
                Self::try_from(val)
            }
        }
    })
}

pub fn generate_simple_enum_binary_encode_impl(en: SimpleEnum) -> syn::Result<TokenStream> {
    let ident = en.ident;
    let repr = en.repr;

    Ok(quote! {
        impl ua_types::BinaryEncodable for #ident {
            #[allow(unused)]
            fn byte_len(&self, ctx: &ua_types::Context<'_>) -> usize {
                ua_types::BinaryEncodable::byte_len(&(*self as #repr), ctx)
            }
            #[allow(unused)]
            fn encode<S: std::io::Write + ?Sized>(
                &self,
                stream: &mut S,
                ctx: &ua_types::Context<'_>,
            ) -> ua_types::EncodingResult<()> {
                ua_types::BinaryEncodable::encode(&(*self as #repr), stream, ctx)
            }
        }
    })
}
