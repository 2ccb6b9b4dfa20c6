//! Demonstration application.
//!
//! Mounts one of every node variant so that `serve` and `routes` have
//! something to show:
//!
//! ```text
//! /                                   @@Home
//! /users/(username)/name              @@PrintName
//! /users/(username)/data/(userdata)   @@UserData
//! /lcomp/(comp)                       @@LeafPlusOneComponent
//! /formatted/(uid%08d)                @@IntegerComponent
//! /orders/(id)                        @@Order (digits only)
//! /files/(*path)                      @@Files
//! /redirtest                          @@RedirectTest → @@Home
//! /resources                          @@EnumResource
//! /deleg                              @@AnswerBabbler (logged)
//! /fold/                              @@DemoFolderWithMenu
//! /fold/greed                         @@Greed
//! ```

use crate::dispatch::{
    handler_fn, DispatchContext, DispatchError, DispatchResult, Flow, GraphBuilder, GraphError,
    MapError, NodeGraph, NodeId, Pass,
};
use crate::enumerate::RouteTable;
use crate::resources::{LogRequests, Redirect, RouteListing, StaticText, ValidateBinding};

/// A built graph and the node requests enter at.
#[derive(Debug)]
pub struct Application {
    pub graph: NodeGraph,
    pub root: NodeId,
}

fn reply(ctx: &mut DispatchContext<'_>, body: String) -> DispatchResult<Flow> {
    let response = ctx.response();
    response.set_content_type("text/plain; charset=utf-8");
    response.write(body.as_bytes());
    Ok(Flow::Handled)
}

fn bound(ctx: &DispatchContext<'_>, name: &str) -> String {
    ctx.get_str(name).unwrap_or_default().to_string()
}

/// Build the demonstration graph.
pub fn build_application() -> Result<Application, GraphError> {
    let mut b = GraphBuilder::new();

    let home = b.leaf(StaticText::plain("resource-dispatch demo\n").described("Front page."));
    b.name(home, "@@Home");

    // users/(username)/...
    let print_name = b.leaf(handler_fn(|ctx| {
        let body = format!("Hello, {}\n", bound(ctx, "username"));
        reply(ctx, body)
    }));
    b.name(print_name, "@@PrintName");

    let user_data = b.var_leaf(
        "userdata",
        None,
        handler_fn(|ctx| {
            let body = format!("{}: {}\n", bound(ctx, "username"), bound(ctx, "userdata"));
            reply(ctx, body)
        }),
    );
    b.name(user_data, "@@UserData");

    let user = b.folder(Pass, [("name", print_name), ("data", user_data)], None);
    let users = b.var_delegator("username", None, Pass, user);

    let lcomp = b.var_leaf(
        "comp",
        None,
        handler_fn(|ctx| {
            let body = format!("component: {}\n", bound(ctx, "comp"));
            reply(ctx, body)
        }),
    );
    b.name(lcomp, "@@LeafPlusOneComponent");

    let formatted = b.var_leaf(
        "uid",
        Some("08d"),
        handler_fn(|ctx| {
            let uid = bound(ctx, "uid");
            if uid.parse::<u64>().is_err() {
                return Err(DispatchError::rejected(404, format!("'{}' is not a number", uid)));
            }
            let link = ctx.map_url("@@IntegerComponent", &[uid.as_str()], &[])?;
            reply(ctx, format!("uid {} lives at {}\n", uid, link))
        }),
    );
    b.name(formatted, "@@IntegerComponent");

    let order = b.leaf(handler_fn(|ctx| {
        let body = format!("Order #{}\n", bound(ctx, "id"));
        reply(ctx, body)
    }));
    b.name(order, "@@Order");
    let orders = b.var_delegator("id", None, ValidateBinding::digits("id"), order);

    let files = b.var_var_leaf(
        "path",
        handler_fn(|ctx| {
            let path = ctx
                .get("path")
                .and_then(|binding| binding.as_list())
                .map(|segments| segments.join("/"))
                .unwrap_or_default();
            reply(ctx, format!("file: /{}\n", path))
        }),
    );
    b.name(files, "@@Files");

    let redirect = b.leaf(Redirect::new("@@Home"));
    b.name(redirect, "@@RedirectTest");

    let listing = b.leaf(RouteListing);
    b.name(listing, "@@EnumResource");

    let answer = b.leaf(StaticText::plain("42\n").described("The answer."));
    b.name(answer, "@@AnswerBabbler");
    let deleg = b.delegator(LogRequests, answer);

    let menu = b.leaf(StaticText::plain("fold: greed\n").described("Folder menu."));
    b.name(menu, "@@DemoFolderWithMenu");
    let greed = b.leaf(StaticText::plain("Greed is good.\n"));
    b.name(greed, "@@Greed");
    let fold = b.folder(Pass, [("greed", greed)], Some(menu));

    let root = b.folder(
        Pass,
        [
            ("users", users),
            ("lcomp", lcomp),
            ("formatted", formatted),
            ("orders", orders),
            ("files", files),
            ("redirtest", redirect),
            ("resources", listing),
            ("deleg", deleg),
            ("fold", fold),
        ],
        Some(home),
    );

    let graph = b.build()?;
    Ok(Application { graph, root })
}

/// Resources served elsewhere but still addressable by id.
pub fn register_static(table: &mut RouteTable) -> Result<(), MapError> {
    table.add_static("@@ExternalExample", "http://paulgraham.com/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::UrlMapper;
    use crate::enumerate;

    #[test]
    fn test_demo_graph_enumerates() {
        let app = build_application().unwrap();
        assert_eq!(enumerate::validate(&app.graph, app.root).unwrap(), 12);
    }

    #[test]
    fn test_demo_patterns() {
        let app = build_application().unwrap();
        let mut table = RouteTable::from_graph(&app.graph, app.root, None).unwrap();
        register_static(&mut table).unwrap();

        assert_eq!(table.pattern("@@Home").unwrap(), "/");
        assert_eq!(table.pattern("@@UserData").unwrap(), "/users/(username)/data/(userdata)");
        assert_eq!(table.pattern("@@IntegerComponent").unwrap(), "/formatted/(uid%08d)");
        assert_eq!(table.pattern("@@Files").unwrap(), "/files/(*path)");
        assert_eq!(table.pattern("@@AnswerBabbler").unwrap(), "/deleg");
        assert_eq!(table.map_url("@@DemoFolderWithMenu", &[], &[]).unwrap(), "/fold/");
        assert_eq!(table.map_url("@@Greed", &[], &[]).unwrap(), "/fold/greed");
        assert_eq!(
            table.map_url("@@IntegerComponent", &["42"], &[]).unwrap(),
            "/formatted/00000042"
        );
        assert_eq!(
            table.map_url("@@ExternalExample", &[], &[]).unwrap(),
            "http://paulgraham.com/"
        );
    }
}
