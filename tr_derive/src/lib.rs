use std::borrow::Cow;

use proc_macro2::{TokenStream, Ident, Span};
use syn::{parse_quote, Data, DataStruct, DeriveInput, Fields, FieldsNamed, FieldsUnnamed, GenericParam};
use quote::quote;

fn read_derive_impl(input: &DeriveInput) -> TokenStream {
	let (fields, tuple) = match &input.data {
		Data::Struct(DataStruct { fields: Fields::Named(FieldsNamed { named, .. }), .. }) => (named, false),
		Data::Struct(DataStruct { fields: Fields::Unnamed(FieldsUnnamed { unnamed, .. }), .. }) => (unnamed, true),
		_ => unimplemented!("only tuple struct or struct with named fields supported"),
	};
	let mut body = quote! {};
	let mut initializer = quote! {};
	let mut tuple_field_num = 0u8..;
	for field in fields {
		let mut field_expr = quote! { Readable::read::<E>(reader) };
		let mut skip = 0usize;
		for attr in &field.attrs {
			if let Some(ident) = attr.path().get_ident() {
				match ident.to_string().as_str() {
					"list_u8" => field_expr = quote! { read_list::<E, u8, _>(reader) },//read a u8, read that many items
					"list_u16" => field_expr = quote! { read_list::<E, u16, _>(reader) },//read a u16, read that many items
					"list_i16" => field_expr = quote! { read_list::<E, i16, _>(reader) },//read an i16, read that many items
					"list_u32" => field_expr = quote! { read_list::<E, u32, _>(reader) },//read a u32, read that many items
					"skip_1" => skip += 1,//skip 1 byte before reading
					"skip_2" => skip += 2,//skip 2 bytes before reading
					"skip_4" => skip += 4,//skip 4 bytes before reading
					"skip_8" => skip += 8,//skip 8 bytes before reading, repeated skips add up
					_ => {},
				}
			}
		}
		field_expr = quote! { tr_reader::#field_expr? };
		if skip > 0 {
			field_expr = quote! {{
				reader.skip(#skip)?;
				#field_expr
			}};
		}
		let field_ident = match &field.ident {
			Some(field_ident) => Cow::Borrowed(field_ident),
			None => Cow::Owned(Ident::new(&format!("field{}", tuple_field_num.next().unwrap()), Span::call_site())),
		};
		body = quote! {
			#body
			let #field_ident = #field_expr;
		};
		initializer = quote! { #initializer #field_ident, };
	}
	initializer = if tuple { quote! { (#initializer) } } else { quote! { {#initializer} } };
	let mut generics = input.generics.clone();
	for param in &mut generics.params {
		if let GenericParam::Type(type_param) = param {
			type_param.bounds.push(parse_quote!(tr_reader::Readable));
		}
	}
	let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
	let type_name = &input.ident;
	quote! {
		impl #impl_generics tr_reader::Readable for #type_name #ty_generics #where_clause {
			fn read<E: tr_reader::ByteOrder>(reader: &mut tr_reader::Reader) -> tr_reader::Result<Self> {
				#body
				Ok(#type_name #initializer)
			}
		}
	}
}

#[proc_macro_derive(
	Readable,
	attributes(
		list_u8,
		list_u16,
		list_i16,
		list_u32,
		skip_1,
		skip_2,
		skip_4,
		skip_8,
	)
)]
pub fn read_derive(tokens: proc_macro::TokenStream) -> proc_macro::TokenStream {
	read_derive_impl(&syn::parse_macro_input!(tokens)).into()
}
